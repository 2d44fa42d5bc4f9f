//! Chromium over CDP.
//!
//! [`CdpBrowser`] owns one Chromium process. Every [`CdpPage`] it hands out
//! lives in its own browser context, so two actors never share cookies,
//! storage or focus. Element actions re-run the selector in the page on every
//! call; nothing is cached on the Rust side.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::BrowserSettings;
use crate::driver::{ElementRef, FocusDescriptor, Key, NodeSnapshot, SemanticsDriver};
use crate::result::{ProbeError, ProbeResult};

fn page_error(e: impl Display) -> ProbeError {
    ProbeError::Page {
        message: e.to_string(),
    }
}

fn input_error(e: impl Display) -> ProbeError {
    ProbeError::Input {
        message: e.to_string(),
    }
}

/// JavaScript string literal for `s`
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// `document.querySelectorAll(selector)[index]`, or `null`
fn element_expr(target: &ElementRef) -> String {
    format!(
        "(document.querySelectorAll({})[{}] || null)",
        js_str(&target.selector),
        target.index
    )
}

/// Shared by snapshot and active-node reads: role, label and the node's own text
const DESCRIBE_FN: &str = r"
const describe = (el) => {
  const own = Array.from(el.childNodes)
    .filter((n) => n.nodeType === Node.TEXT_NODE)
    .map((n) => n.textContent)
    .join(' ')
    .trim();
  return {
    role: el.getAttribute('role'),
    label: el.getAttribute('aria-label'),
    text: own.length > 0 ? own : null,
  };
};";

/// Where a pointer click would land, and what the page reports is there
#[derive(Debug, Deserialize)]
struct ClickPoint {
    x: f64,
    y: f64,
    /// Tag of the element hit at the centre when it is not the target
    #[serde(default)]
    blocker: Option<String>,
}

impl ClickPoint {
    /// The point to click, or the element covering the target
    fn into_point(self) -> ProbeResult<Point> {
        match self.blocker {
            Some(tag) => Err(ProbeError::Input {
                message: format!("intercepted by <{tag}>"),
            }),
            None => Ok(Point {
                x: self.x,
                y: self.y,
            }),
        }
    }
}

/// A launched Chromium process
#[derive(Debug)]
pub struct CdpBrowser {
    settings: BrowserSettings,
    inner: Arc<Mutex<Browser>>,
    handle: JoinHandle<()>,
}

impl CdpBrowser {
    /// Launch Chromium with `settings`
    pub async fn launch(settings: &BrowserSettings) -> ProbeResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                ..Viewport::default()
            });
        if !settings.headless {
            builder = builder.with_head();
        }
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &settings.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            headless = settings.headless,
            width = settings.viewport_width,
            height = settings.viewport_height,
            "chromium launched"
        );
        Ok(Self {
            settings: settings.clone(),
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Settings the process was launched with
    #[must_use]
    pub const fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Open a blank page in a fresh browser context
    pub async fn new_page(&self) -> ProbeResult<CdpPage> {
        let mut browser = self.inner.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(page_error)?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(page_error)?;
        let page = browser.new_page(target).await.map_err(page_error)?;
        tracing::debug!(context = ?context, "isolated page opened");
        Ok(CdpPage {
            page,
            context: Some(context),
        })
    }

    /// Close `page` and drop its browser context
    pub async fn close_page(&self, page: CdpPage) -> ProbeResult<()> {
        let CdpPage { page, context } = page;
        page.close().await.map_err(page_error)?;
        if let Some(context) = context {
            let browser = self.inner.lock().await;
            browser
                .execute(DisposeBrowserContextParams::new(context))
                .await
                .map_err(page_error)?;
        }
        Ok(())
    }

    /// Shut Chromium down
    pub async fn close(self) -> ProbeResult<()> {
        let mut browser = self.inner.lock().await;
        browser.close().await.map_err(|e| ProbeError::BrowserLaunch {
            message: e.to_string(),
        })?;
        self.handle.abort();
        Ok(())
    }
}

/// One tab in its own browser context
#[derive(Debug)]
pub struct CdpPage {
    page: Page,
    context: Option<BrowserContextId>,
}

impl CdpPage {
    /// The underlying chromiumoxide page
    #[must_use]
    pub const fn inner(&self) -> &Page {
        &self.page
    }

    /// Evaluate `body` (an expression) and decode its JSON-stringified value
    async fn eval_json<T: DeserializeOwned>(&self, body: &str) -> ProbeResult<T> {
        let script = format!("JSON.stringify({body})");
        let raw: String = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ProbeError::script(e.to_string()))?
            .into_value()
            .map_err(|e| ProbeError::script(e.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn key_event(&self, kind: DispatchKeyEventType, key: Key) -> ProbeResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.key())
            .code(key.key())
            .windows_virtual_key_code(key.virtual_key_code())
            .native_virtual_key_code(key.virtual_key_code());
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = key.text() {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(input_error)?;
        self.page.execute(params).await.map_err(input_error)?;
        Ok(())
    }
}

#[async_trait]
impl SemanticsDriver for CdpPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.page.url().await.map_err(page_error)?.unwrap_or_default())
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.page.reload().await.map_err(page_error)?;
        Ok(())
    }

    async fn count(&self, selector: &str) -> ProbeResult<usize> {
        self.eval_json(&format!(
            "document.querySelectorAll({}).length",
            js_str(selector)
        ))
        .await
    }

    async fn script_click(&self, selector: &str) -> ProbeResult<bool> {
        self.eval_json(&format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_str(selector)
        ))
        .await
    }

    async fn focus(&self, selector: &str) -> ProbeResult<bool> {
        self.eval_json(&format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
            js_str(selector)
        ))
        .await
    }

    async fn active_node(&self) -> ProbeResult<Option<FocusDescriptor>> {
        self.eval_json(&format!(
            "(() => {{ {DESCRIBE_FN}
              const el = document.activeElement;
              if (!el || el.tagName.toLowerCase() !== 'flt-semantics') return null;
              return describe(el);
            }})()"
        ))
        .await
    }

    async fn snapshot(&self, selector: &str) -> ProbeResult<Vec<NodeSnapshot>> {
        self.eval_json(&format!(
            "(() => {{ {DESCRIBE_FN}
              return Array.from(document.querySelectorAll({})).map((el, index) => {{
                const r = el.getBoundingClientRect();
                return Object.assign(describe(el), {{ index, visible: r.width > 0 && r.height > 0 }});
              }});
            }})()",
            js_str(selector)
        ))
        .await
    }

    async fn click(&self, target: &ElementRef) -> ProbeResult<()> {
        let point: Option<ClickPoint> = self
            .eval_json(&format!(
                "(() => {{ const el = {};
                  if (!el) return null;
                  el.scrollIntoView({{ block: 'center', inline: 'center' }});
                  const r = el.getBoundingClientRect();
                  const x = r.left + r.width / 2;
                  const y = r.top + r.height / 2;
                  const hit = document.elementFromPoint(x, y);
                  const blocker = hit === el || (hit && el.contains(hit))
                    ? null
                    : (hit ? hit.tagName.toLowerCase() : 'nothing');
                  return {{ x, y, blocker }};
                }})()",
                element_expr(target)
            ))
            .await?;
        let point = point
            .ok_or_else(|| ProbeError::not_found(format!("{}[{}]", target.selector, target.index)))?
            .into_point()?;
        self.page.click(point).await.map_err(input_error)?;
        Ok(())
    }

    async fn fill(&self, target: &ElementRef, value: &str) -> ProbeResult<()> {
        let focused: bool = self
            .eval_json(&format!(
                "(() => {{ const host = {};
                  if (!host) return false;
                  const el = host.matches('input, textarea') ? host : host.querySelector('input, textarea');
                  if (!el) return false;
                  el.focus();
                  el.value = '';
                  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                  return true;
                }})()",
                element_expr(target)
            ))
            .await?;
        if !focused {
            return Err(ProbeError::not_found(format!(
                "input in {}[{}]",
                target.selector, target.index
            )));
        }
        self.insert_text(value).await
    }

    async fn press_key(&self, key: Key) -> ProbeResult<()> {
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn insert_text(&self, text: &str) -> ProbeResult<()> {
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(input_error)?;
        Ok(())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> ProbeResult<()> {
        let _: bool = self
            .eval_json(&format!(
                "(() => {{ window.localStorage.setItem({}, {}); return true; }})()",
                js_str(key),
                js_str(value)
            ))
            .await?;
        tracing::debug!(key, "local storage written");
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })
    }
}
