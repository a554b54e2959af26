// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fruit list.
//!
//! Render a nested list once, print each node's index info, and dump the built tree.
//!
//! Run:
//! - `cargo run -p reforest_demos --example fruit_list`
//! - `RUST_LOG=reforest=debug cargo run -p reforest_demos --example fruit_list`

use reforest::{Component, Element, Host, RenderOptions, TreeOptions, render_to_string};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Fruit {
    value: &'static str,
}

fn fruit(value: &'static str, varieties: &'static [&'static str]) -> Element<Fruit> {
    Component::new("Fruit", move |cx| {
        let info = cx.index();
        if let Some(info) = &info {
            println!(
                "{:<8} path={:<4} first={:<5} last={:<5} even={}",
                value,
                info.index_path_string,
                info.is_first(),
                info.is_last(),
                info.is_even(),
            );
        }
        let tree = cx.tree_with(
            varieties.iter().copied().map(|v| fruit(v, &[])),
            TreeOptions::with_data(Fruit { value }),
        )?;
        let mut li = Host::new("li").child(value);
        if !varieties.is_empty() {
            li = li.child(Host::new("ul").child(tree.children()));
        }
        Ok(li.into())
    })
    .into()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app: Element<Fruit> = Component::new("Fruits", |cx| {
        let tree = cx.tree([
            Element::text("Fruit:"),
            fruit("apple", &[]),
            fruit("pear", &["bosc", "comice"]),
            fruit("orange", &[]),
        ])?;
        Ok(Host::new("ul").child(tree.children()).into())
    })
    .into();

    let out = render_to_string(&app, &RenderOptions::default()).expect("render");
    println!("\n{}\n", out.markup);
    for (root, tree) in &out.trees {
        println!("{root}:");
        println!("{}", serde_json::to_string_pretty(tree).expect("encode tree"));
    }
}
