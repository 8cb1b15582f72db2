use inkwell_common::{bail, Uri};
use isahc::{
    config::{Configurable as _, RedirectPolicy},
    AsyncReadResponseExt as _, HttpClient, Request,
};
use rand::Rng;
use tracing::{Instrument, Span};

const USER_AGENT: &str = concat!("inkwell/", env!("CARGO_PKG_VERSION"));

#[tracing::instrument(err, skip(url), fields(url = %url.to_string()))]
pub(crate) async fn req(url: &Uri) -> Result<String, inkwell_common::Report> {
    tracing::info!("fetching");

    let client = HttpClient::builder()
        .default_header("User-Agent", USER_AGENT)
        .default_header("Accept", "application/json")
        .build()?;

    let req = Request::builder()
        .redirect_policy(RedirectPolicy::Follow)
        .uri(url)
        .body(())?;

    let mut res = client.send_async(req).await?;

    if !res.status().is_success() {
        bail!("`{}` answered with status {}", url, res.status());
    }

    let body = res.text().await?;

    Ok(body)
}

/// Short randomized pause between archive pages so the publication does not
/// flag the client as a bot.
#[tracing::instrument(err)]
pub(crate) async fn pause() -> Result<(), inkwell_common::Report> {
    tokio::task::spawn_blocking({
        let span = Span::current();

        move || {
            let _entered = span.enter();

            let length = rand::thread_rng().gen_range(400..700);

            tracing::debug!("pausing for {} milliseconds", length);

            std::thread::sleep(std::time::Duration::from_millis(length));
        }
    })
    .instrument(Span::current())
    .await?;

    Ok(())
}
