//! POST a fixed Lithuanian sentence to the tagger.

use crate::http::{join_url, StatusCode};
use crate::scenario::{IterationContext, LoadError, SetupData};
use crate::scenarios::base_url;
use std::time::Duration;
use tagload_macro::virtual_user;

/// Request body. The non-ASCII letters must reach the wire unchanged.
pub const PAYLOAD: &str = "Mama su kasa kasa smėlį. Žalia, balta, žalia, balta, huh";

pub const CONTENT_TYPE: &str = "plain/text";

/// Upper bound for a healthy transaction.
pub const MAX_TRANSACTION_TIME: Duration = Duration::from_millis(500);

#[virtual_user(
    id = "tag",
    description = "POST a fixed sentence to /tag and check status and latency",
    think_time_ms = 100
)]
pub async fn tag(ctx: &IterationContext, _data: &SetupData) -> Result<(), LoadError> {
    let url = join_url(&base_url(ctx), "/tag");
    let res = ctx
        .http()
        .post(url, PAYLOAD, &[("Content-Type", CONTENT_TYPE)])
        .await;

    ctx.check(&res)
        .that("status was 200", |r| r.status == StatusCode::OK)
        .that("transaction time OK", |r| {
            r.timings.duration < MAX_TRANSACTION_TIME
        });
    Ok(())
}
