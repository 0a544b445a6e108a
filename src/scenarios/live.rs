//! Liveness smoke test.

use crate::http::{join_url, StatusCode};
use crate::scenario::{IterationContext, LoadError, SetupData};
use crate::scenarios::base_url;
use tagload_macro::virtual_user;

#[virtual_user(
    id = "live",
    description = "GET /live and check the service answers 200",
    think_time_ms = 100
)]
pub async fn live(ctx: &IterationContext, _data: &SetupData) -> Result<(), LoadError> {
    let res = ctx.http().get(join_url(&base_url(ctx), "/live")).await;
    ctx.check(&res)
        .that("status was 200", |r| r.status == StatusCode::OK);
    Ok(())
}
