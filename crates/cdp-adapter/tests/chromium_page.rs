//! CdpPage against a real Chromium.
//!
//! Skipped unless a browser is available:
//! ```bash
//! export HEALWRIGHT_USE_REAL_CHROME=1
//! export HEALWRIGHT_CHROME=/usr/bin/chromium   # optional
//! cargo test -p cdp-adapter --test chromium_page -- --nocapture
//! ```

use action_primitives::{ActionError, PageDriver};
use cdp_adapter::{detect_chrome_executable, BrowserSettings, ChromiumSession};
use std::env;
use std::time::Duration;

const FORM: &str = r#"<html><body>
<h1>Sign in</h1>
<label for="email">Email</label>
<input id="email" name="email" type="text">
<input id="locked" value="fixed" readonly>
<button class="primary" onclick="document.title='clicked'">Log in</button>
<div id="late"></div>
<script>setTimeout(function(){document.getElementById('late').innerHTML='<span class=ready>Ready</span>'},300)</script>
</body></html>"#;

fn should_run_real_tests() -> bool {
    env::var("HEALWRIGHT_USE_REAL_CHROME")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn data_url(html: &str) -> String {
    let mut encoded = String::with_capacity(html.len() * 2);
    for ch in html.chars() {
        match ch {
            ' ' => encoded.push_str("%20"),
            '#' => encoded.push_str("%23"),
            '%' => encoded.push_str("%25"),
            '\n' => encoded.push_str("%0A"),
            '"' => encoded.push_str("%22"),
            other => encoded.push(other),
        }
    }
    format!("data:text/html,{}", encoded)
}

async fn open_form() -> Option<(ChromiumSession, cdp_adapter::CdpPage)> {
    if !should_run_real_tests() {
        println!("Skipping real browser test (HEALWRIGHT_USE_REAL_CHROME not set)");
        return None;
    }
    if detect_chrome_executable().is_none() {
        println!("Skipping real browser test (no Chrome/Chromium found)");
        return None;
    }

    let settings = BrowserSettings {
        sandbox: false,
        ..BrowserSettings::default()
    };
    let session = ChromiumSession::launch(&settings)
        .await
        .expect("launch chromium");
    let page = session.new_page().await.expect("open tab");
    page.navigate(&data_url(FORM)).await.expect("load form");
    Some((session, page))
}

#[tokio::test]
async fn every_selector_form_resolves() {
    let Some((session, page)) = open_form().await else {
        return;
    };

    for selector in [
        "button.primary",
        "id=email",
        "xpath=//button[contains(., 'Log')]",
        "text=Log in",
        "text=\"Log in\"",
        "role=button[name=\"Log in\"]",
        "role=textbox[name=\"Email\"]",
    ] {
        let handle = page
            .wait_for(selector, Duration::from_secs(2))
            .await
            .unwrap_or_else(|err| panic!("{selector} did not resolve: {err}"));
        assert_eq!(handle.selector.as_deref(), Some(selector));
    }

    session.close().await.unwrap();
}

#[tokio::test]
async fn click_fill_and_read_back() {
    let Some((session, page)) = open_form().await else {
        return;
    };

    let email = page.wait_for("#email", Duration::from_secs(2)).await.unwrap();
    page.fill(&email, "user@example.com").await.unwrap();
    assert_eq!(page.input_value(&email).await.unwrap(), "user@example.com");

    // filling again replaces rather than appends
    page.fill(&email, "other@example.com").await.unwrap();
    assert_eq!(page.input_value(&email).await.unwrap(), "other@example.com");

    let button = page.wait_for("text=Log in", Duration::from_secs(2)).await.unwrap();
    page.click(&button).await.unwrap();
    let title = page.inner().evaluate("document.title").await.unwrap();
    assert_eq!(title.into_value::<String>().unwrap(), "clicked");

    session.close().await.unwrap();
}

#[tokio::test]
async fn waits_for_late_elements_and_times_out_on_missing_ones() {
    let Some((session, page)) = open_form().await else {
        return;
    };

    page.wait_for("span.ready", Duration::from_secs(3)).await.unwrap();

    let err = page
        .wait_for("#never-there", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::WaitTimeout(_)));

    let err = page
        .wait_for("button[[", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidSelector(_)));

    session.close().await.unwrap();
}

#[tokio::test]
async fn readonly_inputs_are_not_editable() {
    let Some((session, page)) = open_form().await else {
        return;
    };

    let locked = page.wait_for("#locked", Duration::from_secs(2)).await.unwrap();
    let err = page.fill(&locked, "changed").await.unwrap_err();
    assert!(matches!(err, ActionError::NotEditable(_)));
    assert_eq!(page.input_value(&locked).await.unwrap(), "fixed");

    session.close().await.unwrap();
}

#[tokio::test]
async fn closed_tabs_leave_the_session_usable() {
    let Some((session, page)) = open_form().await else {
        return;
    };

    let stale = page.clone();
    page.close().await.unwrap();
    // a closed tab no longer resolves anything
    assert!(stale
        .wait_for("#email", Duration::from_millis(200))
        .await
        .is_err());

    let next = session.new_page().await.unwrap();
    next.navigate(&data_url(FORM)).await.unwrap();
    next.wait_for("#email", Duration::from_secs(2)).await.unwrap();
    next.close().await.unwrap();

    session.close().await.unwrap();
}
