//! GEXF 1.2 serialization of a [`Network`].
//!
//! Node attributes are declared once per key; every edge carries its own id,
//! so parallel edges survive a round trip through Gephi or networkx.

use std::collections::BTreeSet;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::ProjectError;

use super::{Network, ProjectResult};

/// Write `network` as GEXF to `path`, creating parent directories.
pub fn write_gexf_file(network: &Network, path: &Path) -> ProjectResult<()> {
    let write_err = |source| ProjectError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let file = std::fs::File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    write_gexf(network, &mut out).map_err(write_err)?;
    out.flush().map_err(write_err)?;
    tracing::info!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        "wrote GEXF"
    );
    Ok(())
}

/// Serialize `network` as a GEXF 1.2 document.
pub fn write_gexf(network: &Network, out: &mut impl Write) -> io::Result<()> {
    let keys: Vec<&str> = network
        .nodes()
        .flat_map(|n| n.attributes.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<gexf xmlns="http://www.gexf.net/1.2draft" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.gexf.net/1.2draft http://www.gexf.net/1.2draft/gexf.xsd" version="1.2">"#
    )?;
    writeln!(out, "  <meta>")?;
    writeln!(out, "    <creator>belfast-rdf {}</creator>", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "  </meta>")?;
    writeln!(out, r#"  <graph defaultedgetype="directed" mode="static">"#)?;

    if !keys.is_empty() {
        writeln!(out, r#"    <attributes class="node" mode="static">"#)?;
        for (id, key) in keys.iter().enumerate() {
            writeln!(
                out,
                r#"      <attribute id="{id}" title="{}" type="string"/>"#,
                escape(key)
            )?;
        }
        writeln!(out, "    </attributes>")?;
    }

    writeln!(out, "    <nodes>")?;
    for node in network.nodes() {
        let label = node.label.as_deref().unwrap_or(&node.id);
        if node.attributes.is_empty() {
            writeln!(
                out,
                r#"      <node id="{}" label="{}"/>"#,
                escape(&node.id),
                escape(label)
            )?;
            continue;
        }
        writeln!(
            out,
            r#"      <node id="{}" label="{}">"#,
            escape(&node.id),
            escape(label)
        )?;
        writeln!(out, "        <attvalues>")?;
        for (key, value) in &node.attributes {
            if let Some(id) = keys.iter().position(|k| k == key) {
                writeln!(
                    out,
                    r#"          <attvalue for="{id}" value="{}"/>"#,
                    escape(value)
                )?;
            }
        }
        writeln!(out, "        </attvalues>")?;
        writeln!(out, "      </node>")?;
    }
    writeln!(out, "    </nodes>")?;

    writeln!(out, "    <edges>")?;
    for (id, (source, target, edge)) in network.edges().enumerate() {
        writeln!(
            out,
            r#"      <edge id="{id}" source="{}" target="{}" label="{}" weight="{}"/>"#,
            escape(source),
            escape(target),
            escape(&edge.label),
            edge.weight
        )?;
    }
    writeln!(out, "    </edges>")?;
    writeln!(out, "  </graph>")?;
    writeln!(out, "</gexf>")?;
    Ok(())
}

/// Escape for XML attribute values, dropping characters XML 1.0 forbids.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\t' | '\r' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Network {
        let mut net = Network::new();
        net.ensure_node("http://example.org/a");
        net.ensure_node("http://example.org/b");
        let a = net.node_mut("http://example.org/a").unwrap();
        a.label = Some("Heaney & Longley".into());
        a.attributes.insert("type".into(), "Person".into());
        net.add_edge("http://example.org/a", "http://example.org/b", "knows").unwrap();
        net.add_edge("http://example.org/a", "http://example.org/b", "colleague").unwrap();
        net
    }

    fn render(net: &Network) -> String {
        let mut buf = Vec::new();
        write_gexf(net, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn nodes_edges_and_attributes() {
        let xml = render(&sample());
        assert!(xml.contains(r#"<graph defaultedgetype="directed" mode="static">"#));
        assert!(xml.contains(r#"<attribute id="0" title="type" type="string"/>"#));
        assert!(xml.contains(r#"<node id="http://example.org/a" label="Heaney &amp; Longley">"#));
        assert!(xml.contains(r#"<attvalue for="0" value="Person"/>"#));
        // Unlabelled nodes fall back to their id.
        assert!(xml.contains(r#"<node id="http://example.org/b" label="http://example.org/b"/>"#));
        assert!(xml.contains(
            r#"<edge id="0" source="http://example.org/a" target="http://example.org/b" label="knows" weight="2"/>"#
        ));
        assert!(xml.contains(r#"<edge id="1" source="http://example.org/a" target="http://example.org/b" label="colleague" weight="4"/>"#));
    }

    #[test]
    fn escaping_drops_control_characters() {
        assert_eq!(escape("a<b>\"c\"\u{0}"), "a&lt;b&gt;&quot;c&quot;");
    }

    #[test]
    fn file_output_creates_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("network.gexf");
        write_gexf_file(&sample(), &path).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.trim_end().ends_with("</gexf>"));
    }
}
