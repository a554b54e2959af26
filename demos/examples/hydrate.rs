// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hydrate.
//!
//! Lay out a row of cells on the "server", ship the document, and let a long-lived
//! runtime take over without recomputing. Then change a width and watch it settle.
//!
//! Run:
//! - `cargo run -p reforest_demos --example hydrate`

use reforest::{Component, Element, Host, RenderOptions, Runtime, render_to_string};

fn cell(width: u32) -> Element<u32> {
    Component::new("Cell", move |cx| {
        let (_, left) = cx.register_with(width, |snapshot, own| {
            snapshot
                .iter()
                .take_while(|entry| entry.key != own)
                .map(|entry| entry.payload)
                .sum::<u32>()
        })?;
        let style = match left {
            Some(left) => format!("left:{left}px;width:{width}px"),
            None => format!("width:{width}px"),
        };
        Ok(Host::new("div").attr("style", style).into())
    })
    .into()
}

fn row(widths: Vec<u32>) -> Element<u32> {
    Component::new("Row", move |cx| {
        let tree = cx.tree(widths.iter().copied().map(cell))?;
        Ok(Host::new("div").attr("class", "row").child(tree.children()).into())
    })
    .into()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let widths = vec![40, 60, 25, 35];
    let server = render_to_string(&row(widths.clone()), &RenderOptions::default())
        .expect("server render");
    let document = server.document().expect("encode handoff");
    println!("server ({} passes):\n{document}\n", server.passes);

    let mut client = Runtime::new(row(widths), RenderOptions::default());
    client.hydrate(&document);
    let _watch = client.subscribe_trees(|root, tree| {
        let widths: Vec<u32> = tree.children.iter().map(|node| node.data).collect();
        println!("  {root} -> {widths:?}");
    });
    client.mount().expect("mount");
    println!("client after mount: {:?}", client.stats());
    assert_eq!(client.markup(), server.markup);

    client.update(row(vec![10, 60, 25, 35])).expect("update");
    println!("client after update: {:?}", client.stats());
    println!("{}", client.markup());
}
