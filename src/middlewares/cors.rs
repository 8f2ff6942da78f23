use actix_cors::Cors;

/// 抽奖接口只需要 GET / POST；钱包地址通过请求体传递，不需要凭据
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
