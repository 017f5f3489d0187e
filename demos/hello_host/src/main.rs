//! Hello Host Example
//!
//! A Keel host with a handful of linked components:
//!
//! ```text
//! frameworks/PrivateFrameworks/greeting      (provides Greeter)
//! └── salutations                            (uses Greeter)
//! frameworks/PublicFrameworks/example
//! modules/hello                              (declares /hello)
//! └── farewell                               (listens for host.shutdown)
//! modules/version                            (declares /version)
//! modules/shell                              (ignored by keel.toml)
//! ```
//!
//! The loopback chat client stands in for a real platform, so commands are
//! "registered" on the first run and skipped afterwards.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package hello-host
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use keel::framework::LoopbackChatClient;
use keel::prelude::*;
use tracing::info;

// ============================================================================
// greeting.rs
// ============================================================================

/// Capability exposed by the greeting framework.
pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct PlainGreeter {
    host: String,
}

impl Greeter for PlainGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}! Welcome to {}.", self.host)
    }
}

fn greeting() -> Component {
    Component::builder("greeting")
        .entry_point("startGreeting", |ctx| async move {
            info!(host = %ctx.info().name, "Greeting framework ready");
            Ok(())
        })
        .provide::<dyn Greeter>(Arc::new(PlainGreeter {
            host: "the hello host".into(),
        }))
        .build()
}

fn salutations() -> Component {
    Component::builder("salutations")
        .entry_point("startSalutations", |ctx| async move {
            let Some(greeter) = ctx.capability::<dyn Greeter>() else {
                return Err(BoxError::from("greeting framework is not loaded"));
            };
            info!("{}", greeter.greet("salutations"));
            Ok(())
        })
        .build()
}

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static GREETING: ComponentFactory = ComponentFactory::new("greeting", "greeting", greeting);

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static SALUTATIONS: ComponentFactory =
    ComponentFactory::new("greeting", "salutations", salutations);

// ============================================================================
// example.rs
// ============================================================================

fn example() -> Component {
    Component::builder("example")
        .entry_point("initializeExample", |_ctx| async {
            info!("Example framework is now loaded into memory");
            Ok(())
        })
        .build()
}

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static EXAMPLE: ComponentFactory = ComponentFactory::new("example", "example", example);

// ============================================================================
// hello.rs
// ============================================================================

fn hello() -> Component {
    Component::builder("hello")
        .entry_point("helloInit", |ctx| async move {
            match ctx.capability::<dyn Greeter>() {
                Some(greeter) => info!("{}", greeter.greet("module")),
                None => info!("Hello from a host without a greeter"),
            }
            if !ctx.chat_client_loaded() {
                info!("No chat client, /hello stays offline");
            }
            Ok(())
        })
        .build()
}

fn farewell() -> Component {
    Component::builder("farewell")
        .entry_point("farewellInit", |ctx| async move {
            let host = ctx.info().name.clone();
            ctx.bus().on(signals::HOST_SHUTDOWN, move |_| {
                let host = host.clone();
                async move {
                    info!(%host, "Goodbye");
                }
            });
            Ok(())
        })
        .build()
}

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static HELLO: ComponentFactory = ComponentFactory::new("hello", "hello", hello);

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static FAREWELL: ComponentFactory = ComponentFactory::new("hello", "farewell", farewell);

// ============================================================================
// version.rs
// ============================================================================

fn version() -> Component {
    Component::builder("version")
        .entry_point("versionInit", |ctx| async move {
            let registry = ctx.registry();
            info!(
                frameworks = registry.count(ComponentKind::ServiceProvider),
                modules = registry.count(ComponentKind::FeatureUnit),
                "Component counts so far"
            );
            for (name, version) in ctx.versions().snapshot() {
                info!(component = %name, %version, "Version");
            }
            Ok(())
        })
        .build()
}

#[distributed_slice(COMPONENT_FACTORIES)]
#[linkme(crate = keel::framework::linkme)]
static VERSION: ComponentFactory = ComponentFactory::new("version", "version", version);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));

    let runtime = KeelRuntime::builder()
        .search_path(root)
        .working_dir(root)
        .chat_client(Arc::new(LoopbackChatClient::new()))
        .build()?;

    runtime.run().await?;
    Ok(())
}
