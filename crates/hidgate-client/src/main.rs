//! hidgatectl: command-line administrative client for the hidgate filter.
//!
//! ```text
//! hidgatectl [--socket PATH] devices
//! hidgatectl [--socket PATH] set-active <id>
//! hidgatectl [--socket PATH] detect
//! hidgatectl [--socket PATH] attributes
//! hidgatectl [--socket PATH] get-filter
//! hidgatectl [--socket PATH] set-filter <none|all>
//! hidgatectl [--socket PATH] filter-flags <mask>
//! hidgatectl [--socket PATH] get-modify
//! hidgatectl [--socket PATH] insert <scancode>
//! ```
//!
//! The socket path defaults to `$HIDGATE_SOCKET` or
//! `/tmp/hidgate-control.sock`.

#[cfg(unix)]
use anyhow::{bail, Context};
#[cfg(unix)]
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use hidgate_client::{ControlClient, UnixTransport};
#[cfg(unix)]
use hidgate_core::packet::KeyboardPacket;
#[cfg(unix)]
use hidgate_core::rules::{FilterConfig, FilterMode};

#[cfg(unix)]
fn usage() -> ! {
    eprintln!(
        "usage: hidgatectl [--socket PATH] \
         <devices|set-active <id>|detect|attributes|get-filter|\
         set-filter <none|all>|filter-flags <mask>|get-modify|insert <scancode>>"
    );
    std::process::exit(2);
}

/// Parses a u16 argument, accepting decimal or 0x-prefixed hex.
#[cfg(unix)]
fn parse_u16(arg: &str) -> anyhow::Result<u16> {
    let value = if let Some(hex) = arg.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else {
        arg.parse()
    };
    value.with_context(|| format!("not a 16-bit value: {arg}"))
}

#[cfg(unix)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let socket = if args.first().map(String::as_str) == Some("--socket") {
        if args.len() < 2 {
            usage();
        }
        args.remove(0);
        args.remove(0)
    } else {
        std::env::var("HIDGATE_SOCKET").unwrap_or_else(|_| "/tmp/hidgate-control.sock".to_string())
    };

    let Some(command) = args.first().cloned() else {
        usage();
    };

    let transport = UnixTransport::connect(&socket)
        .await
        .with_context(|| format!("cannot reach the filter daemon at {socket}"))?;
    let mut client = ControlClient::new(transport);

    match command.as_str() {
        "devices" => {
            let query = client.get_devices().await?;
            println!("devices: {}  active: {}", query.count, query.active_id);
        }
        "set-active" => {
            let id = parse_u16(args.get(1).map(String::as_str).unwrap_or_else(|| usage()))?;
            client.set_active_device(id).await?;
            println!("active device set to {id}");
        }
        "detect" => {
            println!("press a key on the device to identify…");
            let id = client.detect_device_id().await?;
            println!("input came from device {id} (now active)");
        }
        "attributes" => {
            let attrs = client.get_keyboard_attributes().await?;
            println!(
                "keyboard type {}.{}  mode {}  keys {}  function keys {}  indicators {}",
                attrs.keyboard_id.id_type,
                attrs.keyboard_id.subtype,
                attrs.keyboard_mode,
                attrs.number_of_keys_total,
                attrs.number_of_function_keys,
                attrs.number_of_indicators,
            );
            println!(
                "typematic rate {}..{} cps  delay {}..{} ms",
                attrs.key_repeat_minimum.rate,
                attrs.key_repeat_maximum.rate,
                attrs.key_repeat_minimum.delay,
                attrs.key_repeat_maximum.delay,
            );
        }
        "get-filter" => {
            // First pass sized for a handful of rules; reissue if truncated.
            let (mode, flag_or_count, mut rules) = client.get_filter(8).await?;
            if mode == FilterMode::FlagAndScanCode && rules.len() < flag_or_count as usize {
                (_, _, rules) = client.get_filter(flag_or_count).await?;
            }
            match mode {
                FilterMode::None => println!("filter: none"),
                FilterMode::All => println!("filter: all input dropped"),
                FilterMode::Flags => println!("filter: flag mask 0x{flag_or_count:04X}"),
                FilterMode::FlagAndScanCode => {
                    println!("filter: {flag_or_count} rule(s)");
                    for rule in rules {
                        println!(
                            "  flags 0x{:04X}  scan code 0x{:02X}",
                            rule.flag_predicates, rule.scan_code
                        );
                    }
                }
            }
        }
        "set-filter" => match args.get(1).map(String::as_str) {
            Some("none") => {
                client.set_filter(&FilterConfig::None).await?;
                println!("filtering disabled");
            }
            Some("all") => {
                client.set_filter(&FilterConfig::All).await?;
                println!("all input now dropped");
            }
            _ => usage(),
        },
        "filter-flags" => {
            let mask = parse_u16(args.get(1).map(String::as_str).unwrap_or_else(|| usage()))?;
            client.set_filter(&FilterConfig::Flags(mask)).await?;
            println!("flag filter set to 0x{mask:04X}");
        }
        "get-modify" => {
            let (true_count, mut rules) = client.get_modify(8).await?;
            if rules.len() < true_count as usize {
                (_, rules) = client.get_modify(true_count).await?;
            }
            println!("modify: {true_count} rule(s)");
            for rule in rules {
                println!(
                    "  flags 0x{:04X}  0x{:02X} -> 0x{:02X}",
                    rule.flag_predicates, rule.from_code, rule.to_code
                );
            }
        }
        "insert" => {
            let code = parse_u16(args.get(1).map(String::as_str).unwrap_or_else(|| usage()))?;
            let batch = [
                KeyboardPacket::key_down(0, code),
                KeyboardPacket::key_up(0, code),
            ];
            client.insert_packets(&batch).await?;
            println!("injected press+release of scan code 0x{code:02X}");
        }
        _ => usage(),
    }

    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("hidgatectl requires a Unix platform for its control transport");
    std::process::exit(1);
}
