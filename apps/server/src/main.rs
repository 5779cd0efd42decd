#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kobun_quiz_server::run().await
}
