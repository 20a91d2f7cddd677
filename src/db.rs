use std::time::Duration;

use anyhow::Context;
use bson::doc;
use mongodb::{options::ClientOptions, Client, Database};
use tracing::info;

use crate::config::MongoConfig;

pub async fn connect(cfg: &MongoConfig) -> anyhow::Result<Database> {
    info!(database = %cfg.database, "connecting to mongodb");

    let mut options = ClientOptions::parse(cfg.url.as_str())
        .await
        .context("parse mongodb url")?;
    options.max_pool_size = Some(cfg.max_pool_size);
    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(30));
    options.app_name = Some("usersvc".into());

    let client = Client::with_options(options).context("build mongodb client")?;
    let db = client.database(&cfg.database);

    db.run_command(doc! { "ping": 1 })
        .await
        .context("ping mongodb")?;

    info!("connected to mongodb");
    Ok(db)
}
