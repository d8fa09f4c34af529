use redis_objects::{Client, ClientConfig, DistributedObject};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::from_env()?;
    info!(scan_count = config.scan_count, timeout_ms = config.command_timeout_ms, "starting");
    let client = Client::local(config);

    println!("Redis Objects Demo");
    println!("==================");
    println!();

    let test1 = client.get_bucket::<String>("test1");
    test1.set(&"someValue".to_string()).await?;
    let test2 = client.get_map::<i32, i32>("test2");
    test2.fast_put(&1, &2).await?;

    let keys = client.find_keys("test?")?.collect_all().await?;
    println!("findKeys(\"test?\")      -> {:?}", keys);

    client.flushdb().await?;
    client.get_bucket::<String>("test1").set(&"someValue".to_string()).await?;
    client.get_map::<i32, i32>("map2").fast_put(&1, &2).await?;
    let deleted = client.delete(&["test1", "map2"]).await?;
    println!("delete(test1, map2)    -> {}", deleted);
    let deleted = client.delete(&["test1", "map2"]).await?;
    println!("delete again           -> {}", deleted);

    let test = client.get_bucket::<String>("test");
    test.set(&"someValue".to_string()).await?;
    test.rename("test1").await?;
    let test1 = client.get_bucket::<String>("test1");
    println!(
        "rename(test, test1)    -> test exists: {}, test1 = {:?}",
        test.exists().await?,
        test1.get().await?
    );

    let other = client.get_bucket::<String>("test2");
    other.set(&"someValue2".to_string()).await?;
    let moved = client.renamenx("test1", "test2").await?;
    println!("renamenx(test1, test2) -> {}", moved);
    let moved = client.renamenx("test1", "test3").await?;
    println!("renamenx(test1, test3) -> {}", moved);

    for bucket in client.get_buckets::<String>("test?").await? {
        println!("  {} = {:?}", bucket.name(), bucket.get().await?);
    }

    client.flushdb().await?;
    info!("done");
    Ok(())
}
