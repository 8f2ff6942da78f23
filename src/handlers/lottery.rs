use crate::models::*;
use crate::services::LotteryService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/lottery",
    tag = "lottery",
    request_body = CreateLotteryRequest,
    responses(
        (status = 201, description = "创建抽奖成功", body = LotteryResponse),
        (status = 400, description = "参数缺失或奖项配置非法", body = ApiError),
        (status = 401, description = "签名校验失败", body = ApiError)
    )
)]
/// 创建抽奖：校验钱包签名后落库，返回抽奖码与分享链接
pub async fn create_lottery(
    service: web::Data<LotteryService>,
    body: web::Json<CreateLotteryRequest>,
) -> Result<HttpResponse> {
    match service.create(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Created().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery",
    tag = "lottery",
    params(
        ("creator" = Option<String>, Query, description = "创建者钱包地址"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "获取抽奖列表成功", body = LotteryPage),
        (status = 400, description = "地址格式错误", body = ApiError)
    )
)]
/// 分页获取抽奖列表（倒序）
pub async fn list_lotteries(
    service: web::Data<LotteryService>,
    query: web::Query<LotteryListQuery>,
) -> Result<HttpResponse> {
    match service.list(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{code}",
    tag = "lottery",
    params(("code" = String, Path, description = "抽奖码")),
    responses(
        (status = 200, description = "获取抽奖详情成功", body = LotteryResponse),
        (status = 404, description = "抽奖不存在", body = ApiError)
    )
)]
pub async fn get_lottery(
    service: web::Data<LotteryService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.get(&path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/{code}/join",
    tag = "lottery",
    params(("code" = String, Path, description = "抽奖码")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "报名成功", body = JoinLotteryResponse),
        (status = 400, description = "地址非法、重复报名或抽奖已关闭", body = ApiError),
        (status = 404, description = "抽奖不存在", body = ApiError)
    )
)]
/// 报名参加抽奖，同一地址只能报名一次
pub async fn join_lottery(
    service: web::Data<LotteryService>,
    path: web::Path<String>,
    body: web::Json<AddressRequest>,
) -> Result<HttpResponse> {
    match service.join(&path.into_inner(), body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lottery/{code}/draw",
    tag = "lottery",
    params(("code" = String, Path, description = "抽奖码")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "开奖完成", body = DrawLotteryResponse),
        (status = 400, description = "状态不是 PENDING", body = ApiError),
        (status = 401, description = "非创建者", body = ApiError),
        (status = 404, description = "抽奖不存在", body = ApiError)
    )
)]
/// 开奖（仅创建者，且只能成功一次）
pub async fn draw_lottery(
    service: web::Data<LotteryService>,
    path: web::Path<String>,
    body: web::Json<AddressRequest>,
) -> Result<HttpResponse> {
    match service.draw(&path.into_inner(), body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lottery/{code}/winners",
    tag = "lottery",
    params(("code" = String, Path, description = "抽奖码")),
    responses(
        (status = 200, description = "获取中奖名单成功", body = LotteryWinnersResponse),
        (status = 400, description = "尚未开奖", body = ApiError),
        (status = 404, description = "抽奖不存在", body = ApiError)
    )
)]
pub async fn get_winners(
    service: web::Data<LotteryService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.winners(&path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn lottery_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lottery")
            .route("", web::post().to(create_lottery))
            .route("", web::get().to(list_lotteries))
            .route("/{code}", web::get().to(get_lottery))
            .route("/{code}/join", web::post().to(join_lottery))
            .route("/{code}/draw", web::post().to(draw_lottery))
            .route("/{code}/winners", web::get().to(get_winners)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LotteryConfig;
    use crate::external::InMemoryParticipationSet;
    use actix_web::{App, http::StatusCode, test};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn service() -> LotteryService {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        LotteryService::new(
            db,
            Arc::new(InMemoryParticipationSet::new()),
            LotteryConfig::default(),
        )
    }

    #[actix_web::test]
    async fn test_unknown_code_returns_not_found_envelope() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service().await))
                .service(web::scope("/api/v1").configure(lottery_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/lottery/ZZZZZZZZ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[actix_web::test]
    async fn test_create_with_missing_fields_is_invalid_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service().await))
                .service(web::scope("/api/v1").configure(lottery_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/lottery")
            .set_json(json!({ "title": "No prizes" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[actix_web::test]
    async fn test_list_returns_empty_page() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service().await))
                .service(web::scope("/api/v1").configure(lottery_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/lottery?page=1&per_page=10")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total"], 0);
    }
}
