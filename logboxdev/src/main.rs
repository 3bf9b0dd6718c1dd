mod application;
mod presentation {
    pub mod cli;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    application::run().await
}
