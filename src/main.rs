#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roster_search::run().await
}
