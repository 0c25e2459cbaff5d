//! Chromium driver over CDP.
//!
//! Both selector dialects are evaluated in page JavaScript. Element scripts
//! report the total match count next to their result so the match policy is
//! enforced in one place, [`target_index`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, EventJavascriptDialogOpening,
    HandleJavaScriptDialogParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dialog::{Dialog, DialogAction, DialogSlot, DialogType};
use crate::driver::{require_target, target_index, DriverConfig, Screenshot, StorefrontDriver, SurfaceId};
use crate::locator::{js_string, Locator, SelectorExpr};
use crate::result::{StorefrontError, StorefrontResult};
use crate::wait::LoadState;

const VISIBLE_BODY: &str = "const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
     return s.visibility !== 'hidden' && s.display !== 'none' && (r.width > 0 || r.height > 0);";

const CLICK_BODY: &str = "el.scrollIntoView({ block: 'center' }); el.click(); return true;";

const TEXT_BODY: &str = "return el.textContent || '';";

const LOAD_STATE_SCRIPT: &str = "(() => { \
     const pending = performance.getEntriesByType('resource').some(e => e.responseEnd === 0); \
     return { ready: document.readyState, pending }; })()";

#[derive(Debug, Deserialize)]
struct Probe<T> {
    count: usize,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ReadyState {
    ready: String,
    pending: bool,
}

/// Script running `body` against the element `locator` targets.
///
/// `el` is bound inside `body`; the script evaluates to
/// `{ count, value }` where `value` is null when nothing was targeted.
fn element_script(locator: &Locator, body: &str) -> String {
    format!(
        "(() => {{ const els = {}; const el = {}; \
         return {{ count: els.length, value: el ? (() => {{ {body} }})() : null }}; }})()",
        locator.selector().to_query_all(),
        locator.policy().to_js_pick(),
    )
}

fn fill_body(value: &str) -> String {
    format!(
        "el.focus(); el.value = {}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;",
        js_string(value)
    )
}

fn load_state_of(state: &ReadyState) -> LoadState {
    match state.ready.as_str() {
        "loading" => LoadState::Loading,
        "interactive" => LoadState::DomContentLoaded,
        _ if state.pending => LoadState::Load,
        _ => LoadState::NetworkIdle,
    }
}

/// A Chromium tab driven through chromiumoxide
pub struct ChromiumDriver {
    id: SurfaceId,
    browser: Arc<Mutex<Browser>>,
    page: Page,
    dialogs: DialogSlot,
    navigation_timeout: Duration,
    handler: JoinHandle<()>,
    dialog_listener: JoinHandle<()>,
}

impl fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("id", &self.id)
            .field("navigation_timeout", &self.navigation_timeout)
            .finish_non_exhaustive()
    }
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank tab
    pub async fn launch(config: &DriverConfig) -> StorefrontResult<Self> {
        let mut builder =
            BrowserConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(StorefrontError::driver)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(StorefrontError::driver)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(StorefrontError::driver)?;

        let dialogs = DialogSlot::new();
        let dialog_listener = Self::listen_for_dialogs(&page, dialogs.clone()).await?;

        let id = SurfaceId::new();
        tracing::info!(surface = %id, headless = config.headless, "chromium launched");
        Ok(Self {
            id,
            browser: Arc::new(Mutex::new(browser)),
            page,
            dialogs,
            navigation_timeout: config.navigation_timeout,
            handler,
            dialog_listener,
        })
    }

    async fn listen_for_dialogs(page: &Page, slot: DialogSlot) -> StorefrontResult<JoinHandle<()>> {
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(StorefrontError::driver)?;
        let page = page.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind = format!("{:?}", event.r#type).to_lowercase();
                let dialog = Dialog::new(DialogType::from_cdp(&kind), event.message.clone());
                // Nothing armed: dismiss so the page does not stay blocked.
                let accept = match slot.on_opened(dialog) {
                    DialogAction::Accept => true,
                    DialogAction::Dismiss | DialogAction::Pending => {
                        tracing::warn!(message = %event.message, "dismissing unexpected dialog");
                        false
                    }
                };
                if let Err(err) = page.execute(HandleJavaScriptDialogParams::new(accept)).await {
                    tracing::warn!(error = %err, "failed to handle dialog");
                }
            }
        }))
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> StorefrontResult<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(StorefrontError::driver)?
            .into_value()
            .map_err(StorefrontError::driver)
    }

    async fn probe<T: DeserializeOwned>(
        &self,
        locator: &Locator,
        body: &str,
    ) -> StorefrontResult<Option<T>> {
        let probe: Probe<T> = self.eval(element_script(locator, body)).await?;
        Ok(target_index(locator, probe.count)?.and(probe.value))
    }

    async fn act(&self, locator: &Locator, body: &str) -> StorefrontResult<()> {
        let probe: Probe<bool> = self.eval(element_script(locator, body)).await?;
        require_target(locator, probe.count)?;
        Ok(())
    }

    /// Close the browser
    pub async fn close(self) -> StorefrontResult<()> {
        self.dialog_listener.abort();
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(StorefrontError::driver)?;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl StorefrontDriver for ChromiumDriver {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    async fn goto(&self, url: &str) -> StorefrontResult<()> {
        let navigation = tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await;
        match navigation {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(StorefrontError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            }),
            Err(_) => Err(StorefrontError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {}ms", self.navigation_timeout.as_millis()),
            }),
        }
    }

    async fn current_url(&self) -> StorefrontResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(StorefrontError::driver)?
            .unwrap_or_default())
    }

    async fn go_back(&self) -> StorefrontResult<()> {
        self.eval::<serde_json::Value>("history.back()".to_string())
            .await
            .map(|_| ())
    }

    async fn load_state(&self) -> StorefrontResult<LoadState> {
        let state: ReadyState = self.eval(LOAD_STATE_SCRIPT.to_string()).await?;
        Ok(load_state_of(&state))
    }

    async fn count(&self, selector: &SelectorExpr) -> StorefrontResult<usize> {
        self.eval(format!("({}).length", selector.to_query_all())).await
    }

    async fn is_visible(&self, locator: &Locator) -> StorefrontResult<bool> {
        Ok(self.probe::<bool>(locator, VISIBLE_BODY).await?.unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> StorefrontResult<()> {
        self.act(locator, CLICK_BODY).await
    }

    async fn fill(&self, locator: &Locator, value: &str) -> StorefrontResult<()> {
        self.act(locator, &fill_body(value)).await
    }

    async fn text_content(&self, locator: &Locator) -> StorefrontResult<Option<String>> {
        self.probe(locator, TEXT_BODY).await
    }

    async fn all_text_contents(&self, selector: &SelectorExpr) -> StorefrontResult<Vec<String>> {
        self.eval(format!(
            "({}).map(el => el.textContent || '')",
            selector.to_query_all()
        ))
        .await
    }

    async fn arm_dialog_acceptance(&self) -> StorefrontResult<()> {
        self.dialogs.arm();
        Ok(())
    }

    async fn disarm_dialog_acceptance(&self) -> StorefrontResult<()> {
        self.dialogs.disarm();
        Ok(())
    }

    async fn take_dialog(&self) -> StorefrontResult<Option<Dialog>> {
        Ok(self.dialogs.take())
    }

    async fn screenshot(&self) -> StorefrontResult<Screenshot> {
        use base64::Engine;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(StorefrontError::driver)?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(StorefrontError::driver)?;
        Ok(Screenshot::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MatchPolicy;

    #[test]
    fn test_element_script_carries_policy_pick() {
        let locator = Locator::new("login button", SelectorExpr::css_with_text("button", "Log in"))
            .with_policy(MatchPolicy::Nth(1));
        let script = element_script(&locator, TEXT_BODY);
        assert!(script.contains("els.length > 1 ? els[1] : null"));
        assert!(script.contains("count: els.length"));
    }

    #[test]
    fn test_fill_body_escapes_value() {
        let body = fill_body("O'Brien \"Jr\"");
        assert!(body.contains(&js_string("O'Brien \"Jr\"")));
    }

    #[test]
    fn test_load_state_mapping() {
        let state = |ready: &str, pending| ReadyState {
            ready: ready.to_string(),
            pending,
        };
        assert_eq!(load_state_of(&state("loading", true)), LoadState::Loading);
        assert_eq!(load_state_of(&state("interactive", false)), LoadState::DomContentLoaded);
        assert_eq!(load_state_of(&state("complete", true)), LoadState::Load);
        assert_eq!(load_state_of(&state("complete", false)), LoadState::NetworkIdle);
    }
}
