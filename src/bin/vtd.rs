#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voice_transcribe_server::run().await
}
