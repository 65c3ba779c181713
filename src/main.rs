use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::info;

use quizbank::settings::Settings;
use quizbank::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let settings = Settings::parse();

    // 用户数据目录不存在时创建
    std::fs::create_dir_all(&settings.usr_dir)?;
    info!(
        "Starting quiz server on {} (banks: {}, user data: {})",
        settings.bind,
        settings.data_dir.display(),
        settings.usr_dir.display()
    );

    let state = web::Data::new(AppState::new(&settings));

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(state.clone())
            .wrap(Logger::new("%a %r %s %b %{Referer}i %{User-Agent}i %T"))
            .wrap(cors)
            .configure(quizbank::configure)
    })
    .bind(&settings.bind)?
    .run()
    .await
}
