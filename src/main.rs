mod core;
mod db;
mod handlers;
mod middleware;
mod models;
mod utils;

use crate::db::pool::{create_pool, run_migrations};
use actix_cors::Cors;
use actix_web::{
    http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    web::{self},
    App, HttpServer,
};
use actix_web_httpauth::middleware::HttpAuthentication;
use dotenv::dotenv;
use env_logger::Env;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env file!");

    let pool = create_pool(&database_url)
        .await
        .expect("Failed to create database pool!");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations!");

    // Periodic expiry sweep alongside request traffic; the dashboard
    // covers stale events between ticks.
    let sweep_interval = env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    tokio::spawn(core::sweep::run_periodic(pool.clone(), sweep_interval));

    let host = env::var("HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let address = format!("{}:{}", host, port);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());

    HttpServer::new(move || {
        let auth = HttpAuthentication::bearer(middleware::auth::jwt_validator);
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .send_wildcard()
                    .allowed_headers(vec![AUTHORIZATION, ACCEPT])
                    .allowed_header(CONTENT_TYPE)
                    .max_age(3600),
            )
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(middleware::auth::AuthSecret(
                jwt_secret.clone(),
            )))
            .service(
                // public
                web::scope("/api/auth")
                    .route("/login", web::post().to(handlers::auth::login))
                    .route("/register", web::post().to(handlers::auth::register)),
            )
            .service(
                // private
                web::scope("/api")
                    .wrap(auth)
                    .route("/events", web::get().to(handlers::event::list_events))
                    .route("/events", web::post().to(handlers::event::create_event))
                    .route("/events/{id}", web::get().to(handlers::event::get_event))
                    .route("/rsvp/{token}", web::get().to(handlers::rsvp::get_rsvp))
                    .route("/rsvp/{token}", web::post().to(handlers::rsvp::post_rsvp))
                    .route(
                        "/rsvp/{token}/response",
                        web::get().to(handlers::rsvp::get_my_response),
                    )
                    .route(
                        "/scheduled/{token}",
                        web::get().to(handlers::event::get_scheduled),
                    ),
            )
    })
    .bind(&address)?
    .run()
    .await
}
