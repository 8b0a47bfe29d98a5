use actix_web::{HttpResponse, Responder, web};
use dotenvy::dotenv;
use serde_json::json;

use microbase::config::{get_config, init_config};
use microbase::runtime::{ServerOptions, run_server};
use microbase::system::{init_logging, install_panic_hook};

async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({ "service": "microbase", "message": "hello" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_config();

    let config = get_config();
    let _log_guard = init_logging(&config);
    install_panic_hook();

    let options = ServerOptions::new()
        .with_name(&config.service.name)
        .with_configure(|cfg| {
            cfg.route("/", web::get().to(index));
        });

    options.on_close("example", || async {
        tracing::info!("Example close hook ran");
        Ok(())
    });

    run_server(options).await
}
