//! JavaScript evaluation scripts
//!
//! Scripts evaluated in the rendered page by the rendering fetcher.

/// Scroll one step down; returns whether the bottom was reached
///
/// `{step}` is replaced with the step height in pixels.
pub const SCROLL_STEP_SCRIPT: &str = r#"
    (() => {
        window.scrollBy(0, {step});
        const el = document.scrollingElement || document.documentElement;
        return (window.innerHeight + window.scrollY) >= (el ? el.scrollHeight : 0);
    })()
"#;

/// Snapshot of the rendered page: title, visible text, anchors and the
/// navigation response status
pub const SNAPSHOT_SCRIPT: &str = r#"
    (() => {
        const seen = new Set();
        const links = [];
        document.querySelectorAll('a[href]').forEach(a => {
            const href = a.href;
            if (!href || seen.has(href)) {
                return;
            }
            seen.add(href);
            links.push({
                href: href,
                text: (a.innerText || a.textContent || '').trim().slice(0, 200)
            });
        });

        let status = 200;
        try {
            const nav = performance.getEntriesByType('navigation')[0];
            if (nav && typeof nav.responseStatus === 'number' && nav.responseStatus > 0) {
                status = nav.responseStatus;
            }
        } catch (e) {}

        return {
            url: window.location.href,
            title: document.title || '',
            content_type: document.contentType || 'text/html',
            status: status,
            text: document.body ? (document.body.innerText || '') : '',
            links: links
        };
    })()
"#;

/// Build the scroll script for a given step
#[must_use]
pub fn scroll_step_script(step_px: u32) -> String {
    SCROLL_STEP_SCRIPT.replace("{step}", &step_px.to_string())
}
