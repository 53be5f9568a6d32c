#[tokio::main]
async fn main() -> anyhow::Result<()> {
    poll_server::start_server().await
}
