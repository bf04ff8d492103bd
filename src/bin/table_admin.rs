use accountd::{
    admin::{repl, DynamoCatalog},
    dynamo, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("warn");

    let aws = dynamo::AwsConfig::default();
    println!("대상: {}", aws.target_display());

    let client = dynamo::create_client(&aws).await;
    repl::run(&DynamoCatalog::new(client)).await
}
