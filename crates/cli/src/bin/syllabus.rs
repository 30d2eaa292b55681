use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    syllabus_cli::main_entry().await
}
