use crate::{
    api::{attendance, exams, fees, marks},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .configure(api_routes)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter), // rate limiting
    );
}

/// Every protected endpoint, relative to the API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    // malformed bodies and query strings surface as validation errors
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/attendance")
            // /attendance
            .service(
                web::resource("")
                    .route(web::get().to(attendance::attendance_sheet))
                    .route(web::post().to(attendance::mark_attendance)),
            )
            .service(web::resource("/status").route(web::get().to(attendance::attendance_status)))
            .service(
                web::resource("/finalize").route(web::post().to(attendance::finalize_attendance)),
            )
            .service(
                web::resource("/student-report").route(web::get().to(attendance::student_report)),
            ),
    )
    .service(
        web::scope("/fees")
            .service(
                web::resource("/status")
                    .route(web::get().to(fees::fee_status))
                    .route(web::put().to(fees::set_fee_status)),
            )
            .service(web::resource("/payments").route(web::post().to(fees::record_payment))),
    )
    .service(
        web::scope("/exams")
            .service(
                web::resource("/marksheets/upload").route(web::post().to(exams::upload_marksheet)),
            )
            .service(web::resource("/results/approve").route(web::post().to(exams::approve_result)))
            .service(web::resource("/results/grid").route(web::get().to(exams::results_grid)))
            .service(web::resource("/student-result").route(web::get().to(exams::student_result))),
    )
    .service(
        web::scope("/marks")
            // /marks
            .service(
                web::resource("")
                    .route(web::get().to(marks::list_assessments))
                    .route(web::post().to(marks::create_assessment)),
            )
            // /marks/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(marks::get_assessment))
                    .route(web::put().to(marks::update_assessment))
                    .route(web::delete().to(marks::delete_assessment)),
            ),
    );
}
