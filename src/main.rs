use actix_web::{App, HttpServer, middleware::Logger, web};
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local;  // timestamp in log lines
use std::sync::Arc;

use hashfans_lottery::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{InMemoryParticipationSet, ParticipationSet, RedisParticipationSet},
    handlers,
    middlewares::create_cors,
    services::LotteryService,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 参与集合：配置了 redis 时多实例共享，否则进程内
    let participants: Arc<dyn ParticipationSet> = match config.redis.url.as_deref() {
        Some(url) => Arc::new(
            RedisParticipationSet::connect(url)
                .await
                .expect("Failed to connect to redis"),
        ),
        None => {
            log::warn!("REDIS_URL not configured, using in-process participation set");
            Arc::new(InMemoryParticipationSet::new())
        }
    };

    let lottery_service = LotteryService::new(pool.clone(), participants, config.lottery.clone());

    // 启动后台任务
    tasks::spawn_all(lottery_service.clone(), config.lottery.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(lottery_service.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::lottery_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await;

    log::info!("HTTP server stopped");
    result
}
