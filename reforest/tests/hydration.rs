// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handing one-shot results to the incremental runtime.

use reforest::{
    Component, DATA_ID, Element, Handoff, Host, RenderOptions, Runtime, render_to_string,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn cell(width: u32) -> Element<u32> {
    Component::new("Cell", move |cx| {
        let (_, offset) = cx.register_with(width, |snapshot, own| {
            snapshot
                .iter()
                .take_while(|entry| entry.key != own)
                .map(|entry| entry.payload)
                .sum::<u32>()
        })?;
        let style = match offset {
            Some(x) => format!("left:{x}px;width:{width}px"),
            None => format!("width:{width}px"),
        };
        Ok(Host::new("div").attr("style", style).into())
    })
    .into()
}

fn row(widths: &'static [u32]) -> Element<u32> {
    Component::new("Row", move |cx| {
        let tree = cx.tree(widths.iter().copied().map(cell))?;
        Ok(Host::new("div").attr("class", "row").child(tree.children()).into())
    })
    .into()
}

const WIDTHS: &[u32] = &[40, 60, 25, 35];

#[test]
fn hydrated_runtime_reuses_one_shot_values() {
    init_tracing();
    let out = render_to_string(&row(WIDTHS), &RenderOptions::default()).unwrap();
    assert!(out.markup.contains("left:125px;width:35px"), "{}", out.markup);
    let document = out.document().unwrap();
    assert!(document.contains(DATA_ID));

    let mut runtime = Runtime::new(row(WIDTHS), RenderOptions::default());
    assert!(runtime.hydrate(&document));
    runtime.mount().unwrap();

    assert_eq!(runtime.markup(), out.markup, "first paint matches the server");
    let stats = runtime.stats();
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.hydrated_hits, 4);
    assert_eq!(stats.reducer_runs, 0, "nothing recomputed");
}

#[test]
fn hydrated_values_recompute_after_a_change() {
    let out = render_to_string(&row(WIDTHS), &RenderOptions::default()).unwrap();
    let mut runtime = Runtime::new(row(WIDTHS), RenderOptions::default());
    runtime.preload(out.handoff);
    runtime.mount().unwrap();

    runtime.update(row(&[10, 60, 25, 35])).unwrap();
    assert!(runtime.markup().contains("left:95px;width:35px"), "{}", runtime.markup());
    assert!(runtime.stats().reducer_runs >= 4);
}

#[test]
fn mismatched_keys_fall_back_to_recomputing() {
    let out = render_to_string(&row(WIDTHS), &RenderOptions::default()).unwrap();
    let options = RenderOptions::default().with_root_prefix("grid");
    let mut runtime = Runtime::new(row(WIDTHS), options);
    runtime.preload(out.handoff.clone());
    runtime.mount().unwrap();

    assert_eq!(runtime.markup(), out.markup);
    assert_eq!(runtime.stats().hydrated_hits, 0);
    assert_eq!(runtime.stats().reducer_runs, 4);
}

#[test]
fn missing_or_broken_blob_is_not_an_error() {
    let mut runtime = Runtime::new(row(WIDTHS), RenderOptions::default());
    assert!(!runtime.hydrate("<html></html>"));
    let broken = format!(r#"<script id="{DATA_ID}" type="application/json">{{"tree-0":</script>"#);
    assert!(!runtime.hydrate(&broken));
    runtime.mount().unwrap();
    assert!(runtime.markup().contains("left:0px;width:40px"));
}

#[test]
fn handoff_round_trips_through_json() {
    let out = render_to_string(&row(WIDTHS), &RenderOptions::default()).unwrap();
    let json = out.handoff.stringify().unwrap();
    assert_eq!(json, r#"{"tree-0":{"0":0,"1":40,"2":100,"3":125}}"#);
    assert_eq!(Handoff::from_json(&json).unwrap(), out.handoff);
    assert!(Handoff::from_json("[1,2]").is_err());
}
