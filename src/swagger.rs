use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::LotteryStatus;
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::lottery::create_lottery,
        handlers::lottery::list_lotteries,
        handlers::lottery::get_lottery,
        handlers::lottery::join_lottery,
        handlers::lottery::draw_lottery,
        handlers::lottery::get_winners,
    ),
    components(
        schemas(
            LotteryStatus,
            PrizeInput,
            CreateLotteryRequest,
            AddressRequest,
            LotteryListQuery,
            LotteryResponse,
            PrizeResponse,
            CreatorInfo,
            LotterySummaryResponse,
            LotteryPage,
            JoinLotteryResponse,
            DrawLotteryResponse,
            WinnerResponse,
            LotteryWinnersResponse,
            ApiError,
        )
    ),
    tags(
        (name = "lottery", description = "Lottery create / join / draw API"),
    ),
    info(
        title = "HashFans Lottery API",
        version = "1.0.0",
        description = "Community lottery REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_lottery_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/lottery",
            "/lottery/{code}",
            "/lottery/{code}/join",
            "/lottery/{code}/draw",
            "/lottery/{code}/winners",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
