use super::*;
use crate::timeline::model::{Event, Op};

#[test]
fn finds_single_and_double_quoted_refs() {
    let html = r#"<link href="style.css"><img src='img/a.png'><script src="https://x/y.js"></script>"#;
    assert_eq!(
        find_asset_refs(html),
        vec!["style.css", "img/a.png", "https://x/y.js"]
    );
}

#[test]
fn reports_only_missing_local_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    std::fs::write(dir.path().join("img/logo one.png"), b"png").unwrap();
    std::fs::write(dir.path().join("style.css"), b"").unwrap();
    let scene = dir.path().join("scene.html");
    std::fs::write(
        &scene,
        r##"<html><head><link href="style.css?v=3"></head><body>
        <img src="img/logo%20one.png"><img src="img/gone.png">
        <a href="#top">top</a><img src="data:image/png;base64,AAAA">
        <script src="https://cdn.example.com/gsap.js"></script></body></html>"##,
    )
    .unwrap();

    let missing = check_assets_exist(&scene).unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].reference, "img/gone.png");
    assert_eq!(missing[0].resolved, dir.path().join("img/gone.png"));
}

#[test]
fn unreadable_scene_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(check_assets_exist(&dir.path().join("nope.html")).is_err());
}

#[test]
fn collects_ids_but_not_data_ids() {
    let html = r#"<div id="stage"><span id='title'></span><p data-id="x" id=bare></p></div>"#;
    let ids: Vec<String> = element_ids(html).into_iter().collect();
    assert_eq!(ids, vec!["bare", "stage", "title"]);
}

#[test]
fn missing_targets_are_unique_and_ordered() {
    let html = r#"<div id="stage"><h1 id="title"></h1></div>"#;
    let ev = |t_ms, target: &str| Event {
        t_ms,
        op: Op::LayerShow,
        target: target.to_owned(),
        value: None,
        trigger: None,
    };
    let tl = Timeline {
        duration_ms: 1000,
        fps: 30,
        voiceover_segments: None,
        events: vec![ev(0, "chart"), ev(10, "title"), ev(20, "badge"), ev(30, "chart")],
    };
    assert_eq!(missing_targets(html, &tl), vec!["chart", "badge"]);
}
