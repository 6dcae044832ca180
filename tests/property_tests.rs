use headerecho::common::{ProbeTransport, spawn_test_server};
use headerecho::{ClientConfig, EchoedHeaders, HttpConfig, ProbeClient};
use proptest::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a printable-ASCII User-Agent comes back byte for byte
    #[test]
    fn echo_preserves_printable_user_agent(agent in "[!-~]([ -~]{0,60}[!-~])?") {
        tokio_test::block_on(async {
            let (handle, addr, shutdown) = spawn_test_server(HttpConfig::default()).await
                .map_err(|e| TestCaseError::fail(format!("Server setup failed: {}", e)))?;

            let mut client = ProbeClient::new(ClientConfig::default())
                .map_err(|e| TestCaseError::fail(format!("Client setup failed: {}", e)))?;
            let target = format!("http://{addr}/").parse()
                .map_err(|e| TestCaseError::fail(format!("Bad target: {}", e)))?;

            let response = client.get(&target, &agent).await
                .map_err(|e| TestCaseError::fail(format!("Request failed: {}", e)))?;
            let echoed = EchoedHeaders::from_json(&response.body)
                .map_err(|e| TestCaseError::fail(format!("Body is not a header object: {}", e)))?;

            let _ = shutdown.send(());
            handle.abort();

            prop_assert_eq!(response.status.as_u16(), 200);
            prop_assert_eq!(echoed.get("User-Agent"), Some(agent.as_str()));
            Ok(())
        })?;
    }

    /// Property: every header sent is present in the echo, whatever the name's case
    #[test]
    fn echo_contains_every_header(
        headers in prop::collection::btree_map("x-[a-z]{1,12}", "[!-~]{1,20}", 1..12)
    ) {
        tokio_test::block_on(async {
            let (handle, addr, shutdown) = spawn_test_server(HttpConfig::default()).await
                .map_err(|e| TestCaseError::fail(format!("Server setup failed: {}", e)))?;

            let mut request = String::from("GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n");
            for (name, value) in &headers {
                request.push_str(&format!("{}: {}\r\n", name.to_uppercase(), value));
            }
            request.push_str("\r\n");

            let mut stream = TcpStream::connect(addr).await
                .map_err(|e| TestCaseError::fail(format!("Connect failed: {}", e)))?;
            stream.write_all(request.as_bytes()).await
                .map_err(|e| TestCaseError::fail(format!("Write failed: {}", e)))?;
            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await
                .map_err(|e| TestCaseError::fail(format!("Read failed: {}", e)))?;

            let _ = shutdown.send(());
            handle.abort();

            let raw = String::from_utf8_lossy(&raw).into_owned();
            let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();
            let echoed = EchoedHeaders::from_json(body.as_bytes())
                .map_err(|e| TestCaseError::fail(format!("Body is not a header object: {}", e)))?;

            prop_assert_eq!(echoed.len(), headers.len() + 2);
            for (name, value) in &headers {
                prop_assert_eq!(echoed.get(name), Some(value.as_str()));
            }
            Ok(())
        })?;
    }
}
