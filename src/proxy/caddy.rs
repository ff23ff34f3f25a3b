// ABOUTME: Caddyfile rendering.
// ABOUTME: A cookie header matcher keeps pinned sessions on the outgoing slot.

use super::{Routes, Site};
use std::fmt::Write;

/// Render a complete Caddyfile for the site.
pub fn render_caddyfile(site: &Site, routes: &Routes) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{} {{", site.address());

    match routes {
        Routes::Single { port } => {
            let _ = writeln!(out, "    reverse_proxy localhost:{port}");
        }
        Routes::Split {
            cookie,
            pinned_slot,
            pinned_port,
            fallback_port,
        } => {
            let _ = writeln!(out, "    @pinned header Cookie *{cookie}={pinned_slot}*");
            let _ = writeln!(out, "    handle @pinned {{");
            let _ = writeln!(out, "        reverse_proxy localhost:{pinned_port}");
            let _ = writeln!(out, "    }}");
            let _ = writeln!(out, "    handle {{");
            let _ = writeln!(out, "        reverse_proxy localhost:{fallback_port}");
            let _ = writeln!(out, "    }}");
        }
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slot;

    fn site(https: bool) -> Site {
        Site {
            domain: "shop.example.com".to_string(),
            https,
        }
    }

    #[test]
    fn single_upstream_with_https() {
        let rendered = render_caddyfile(&site(true), &Routes::Single { port: 8081 });
        assert_eq!(
            rendered,
            "shop.example.com {\n    reverse_proxy localhost:8081\n}\n"
        );
    }

    #[test]
    fn plain_http_site_address() {
        let rendered = render_caddyfile(&site(false), &Routes::Single { port: 8080 });
        assert!(rendered.starts_with("http://shop.example.com {"));
    }

    #[test]
    fn split_routes_pinned_cookie_to_old_slot() {
        let rendered = render_caddyfile(
            &site(true),
            &Routes::Split {
                cookie: "X-Server-Slot".to_string(),
                pinned_slot: Slot::Blue,
                pinned_port: 8080,
                fallback_port: 8081,
            },
        );

        assert!(rendered.contains("@pinned header Cookie *X-Server-Slot=blue*"));
        let pinned = rendered.find("handle @pinned").unwrap();
        let old = rendered.find("localhost:8080").unwrap();
        let fallback = rendered.rfind("handle {").unwrap();
        let new = rendered.find("localhost:8081").unwrap();
        assert!(pinned < old && old < fallback && fallback < new);
    }
}
