use anyhow::Context;
use tracing::info;

use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    app.store
        .migrate()
        .await
        .context("failed to create paste table")?;
    info!("paste table ready");
    app.store.close().await;
    Ok(())
}
