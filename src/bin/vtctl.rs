#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vtctl::run().await
}
