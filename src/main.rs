// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::{Args, HeapSetting, OutputFormat};
use clap::Parser;
use edgefirst_buffer::{
    layout, BufferDescriptor, BufferKind, BufferManager, HeapProvider, ImageFormat,
    MemoryProvider, Properties, View,
};
use serde_json::{json, Value};
use std::{error::Error, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let journald = tracing_journald::layer().ok();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(journald)
        .init();
}

fn provider(heap: HeapSetting) -> Result<Arc<dyn MemoryProvider>, Box<dyn Error>> {
    match heap {
        HeapSetting::Process => Ok(Arc::new(HeapProvider::new())),
        #[cfg(target_os = "linux")]
        HeapSetting::Cma => Ok(Arc::new(edgefirst_buffer::DmaHeapProvider::new(
            edgefirst_buffer::HeapSource::Cma,
        )?)),
        #[cfg(target_os = "linux")]
        HeapSetting::System => Ok(Arc::new(edgefirst_buffer::DmaHeapProvider::new(
            edgefirst_buffer::HeapSource::System,
        )?)),
        #[cfg(not(target_os = "linux"))]
        other => Err(format!("{other:?} heap requires Linux").into()),
    }
}

/// Sub-views and tensor reinterpretations of an allocated buffer. Views the
/// buffer does not support are reported with the reason.
fn collect_views(desc: &BufferDescriptor) -> Vec<(String, Result<BufferDescriptor, String>)> {
    let mut out = Vec::new();
    let batch = match desc.view() {
        View::Image(img) => img.batch_size,
        View::Tensor(t) => t.dims()[0],
        View::Raw => 0,
    };
    for b in 0..batch {
        out.push((
            format!("sub_view[{b}]"),
            desc.sub_view(b, None).map_err(|e| e.to_string()),
        ));
    }

    if let Some(img) = desc.as_image() {
        match img.format {
            ImageFormat::Nv12 | ImageFormat::P010 => match desc.image_to_luma_chroma() {
                Ok((luma, chroma)) => {
                    out.push(("luma".to_owned(), Ok(luma)));
                    out.push(("chroma".to_owned(), Ok(chroma)));
                }
                Err(e) => out.push(("luma_chroma".to_owned(), Err(e.to_string()))),
            },
            _ => out.push((
                "tensor".to_owned(),
                desc.image_to_tensor().map_err(|e| e.to_string()),
            )),
        }
    }
    out
}

fn report_layout(args: &Args, props: &Properties) -> Result<(), Box<dyn Error>> {
    let oracle = args.oracle()?;
    let (view, size) = layout::compute(&oracle, props)?;
    match args.output {
        OutputFormat::Json => {
            let mut report = serde_json::to_value(view)?;
            if let Value::Object(map) = &mut report {
                map.insert("size".to_owned(), json!(size));
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => println!("{} {:?} size:{}", view.kind(), view, size),
    }
    Ok(())
}

fn report_allocation(args: &Args, props: &Properties) -> Result<(), Box<dyn Error>> {
    let mgr = BufferManager::builder()
        .provider(provider(args.heap)?)
        .oracle(Arc::new(args.oracle()?))
        .build();

    let mut desc = BufferDescriptor::new();
    mgr.allocate(&mut desc, props)?;
    info!("allocated {}", desc);

    let views = if args.views && desc.kind() != BufferKind::Raw {
        collect_views(&desc)
    } else {
        Vec::new()
    };

    match args.output {
        OutputFormat::Json => {
            let views: serde_json::Map<String, Value> = views
                .into_iter()
                .map(|(name, v)| {
                    let value = match v {
                        Ok(d) => serde_json::to_value(&d).unwrap_or(Value::Null),
                        Err(e) => json!({ "error": e }),
                    };
                    (name, value)
                })
                .collect();
            let mut report = serde_json::to_value(&desc)?;
            if let Value::Object(map) = &mut report {
                if args.views {
                    map.insert("views".to_owned(), Value::Object(views));
                }
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{}", desc);
            for (name, v) in views {
                match v {
                    Ok(d) => println!("  {name}: {d}"),
                    Err(e) => println!("  {name}: {e}"),
                }
            }
        }
    }

    if let Err(e) = mgr.free(&mut desc) {
        warn!("free failed: {}", e);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let props = args.properties();
    if args.allocate {
        report_allocation(&args, &props)
    } else {
        report_layout(&args, &props)
    }
}
