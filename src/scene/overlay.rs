use crate::foundation::error::{FrameclockError, FrameclockResult};
use crate::timeline::model::Segment;
use regex::Regex;
use std::sync::LazyLock;

/// How long the overlay keeps ticking when there are no segments.
const NO_SEGMENTS_END_MS: i64 = 30_000;
/// Extra time the overlay keeps ticking after the last segment ends.
const TAIL_MS: i64 = 2_000;

static BODY_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body\b[^>]*>").expect("body pattern is valid"));
static BODY_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("body pattern is valid"));

const OVERLAY_HTML: &str = r#"
<div id="debugOverlay" style="position:fixed;top:0;left:0;right:0;background:rgba(0,0,0,0.9);color:#fff;font-family:'SF Mono',monospace;font-size:14px;padding:16px 24px;z-index:9999;display:flex;gap:24px;align-items:center;">
  <div id="debugTimer" style="font-size:28px;font-weight:bold;min-width:100px;color:#4ade80;">0.0s</div>
  <div id="debugScript" style="flex:1;font-size:16px;line-height:1.5;color:#e5e7eb;">&mdash;</div>
</div>
"#;

/// Add an elapsed-time and voiceover-caption overlay to a scene.
///
/// The overlay markup goes right after the opening `<body>` tag and the driving script right
/// before `</body>` (appended when the document has none). Timing starts when playback starts
/// and follows the page clock: the script wraps the page's `hook` once the document is parsed,
/// and also starts on the first click for pages played through a control. A page without the
/// hook never gets one from the overlay.
pub fn inject_debug_overlay(
    html: &str,
    segments: &[Segment],
    hook: &str,
) -> FrameclockResult<String> {
    // `</` would end the inline script early.
    let segments_json = serde_json::to_string(segments)
        .map_err(|e| FrameclockError::serde(format!("encode segments: {e}")))?
        .replace("</", "<\\/");
    let hook = serde_json::to_string(hook)
        .map_err(|e| FrameclockError::serde(format!("encode hook name: {e}")))?;
    let stop_ms = segments.last().map_or(NO_SEGMENTS_END_MS, |s| s.end_ms) + TAIL_MS;

    let script = format!(
        r#"
<script>
(function () {{
  var segments = {segments_json};
  var hook = {hook};
  var startedAt = null;

  function tick() {{
    if (startedAt === null) return;
    var elapsed = Date.now() - startedAt;
    document.getElementById('debugTimer').textContent = (elapsed / 1000).toFixed(1) + 's';
    var seg = segments.find(function (s) {{ return elapsed >= s.start_ms && elapsed < s.end_ms; }});
    document.getElementById('debugScript').textContent = seg ? '"' + seg.text + '"' : '\u2014';
    if (elapsed < {stop_ms}) requestAnimationFrame(tick);
  }}

  function start() {{
    if (startedAt !== null) return;
    startedAt = Date.now();
    tick();
  }}

  function wrap() {{
    var original = window[hook];
    if (typeof original !== 'function') return;
    window[hook] = function () {{
      start();
      return original.apply(this, arguments);
    }};
  }}

  document.addEventListener('click', start, {{ capture: true, once: true }});
  if (document.readyState === 'loading') {{
    document.addEventListener('DOMContentLoaded', wrap);
  }} else {{
    wrap();
  }}
}})();
</script>
"#
    );

    let mut out = match BODY_OPEN_RE.find(html) {
        Some(m) => format!("{}\n{OVERLAY_HTML}{}", &html[..m.end()], &html[m.end()..]),
        None => format!("{OVERLAY_HTML}{html}"),
    };
    match BODY_CLOSE_RE.find(&out) {
        Some(m) => out.insert_str(m.start(), &script),
        None => out.push_str(&script),
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/overlay.rs"]
mod tests;
