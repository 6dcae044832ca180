use super::config::ProbeConfig;
use super::response::ProbeResponse;
use crate::Result;
use crate::common::ProbeTransport;
use std::io::Write;
use tracing::{info, warn};

/// Writes the report block for one probe.
///
/// The body is printed twice, once bare and once labelled, followed by an
/// empty line:
///
/// ```text
/// {body}
/// Testing with User-Agent: {agent}
/// Response Status Code: {status}
/// Response Body: {body}
///
/// ```
pub fn write_report<W: Write>(
    out: &mut W,
    user_agent: &str,
    response: &ProbeResponse,
) -> std::io::Result<()> {
    let body = response.text();
    writeln!(out, "{body}")?;
    writeln!(out, "Testing with User-Agent: {user_agent}")?;
    writeln!(out, "Response Status Code: {}", response.status.as_u16())?;
    writeln!(out, "Response Body: {body}\n")?;
    out.flush()
}

/// Probes the configured target once per User-Agent, in list order.
///
/// Every response is reported whatever its status. The first transport
/// error stops the run and is returned; no request is sent after it.
/// Returns the number of probes completed.
pub async fn run_probe<T, W>(transport: &mut T, config: &ProbeConfig, out: &mut W) -> Result<usize>
where
    T: ProbeTransport + ?Sized,
    W: Write,
{
    let mut completed = 0;

    for user_agent in &config.user_agents {
        info!(target_url = %config.target, %user_agent, "Sending probe");

        let response = match transport.get(&config.target, user_agent).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%user_agent, completed, error = %e, "Probe failed, aborting run");
                return Err(e);
            }
        };

        info!(
            %user_agent,
            status = response.status.as_u16(),
            bytes = response.body.len(),
            "Probe answered"
        );
        write_report(out, user_agent, &response)?;
        completed += 1;
    }

    Ok(completed)
}
