mod host;
mod output;
mod tls;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
