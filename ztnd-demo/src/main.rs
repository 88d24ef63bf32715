use log::{info, warn};

use ztnd_core::capture::load_sequences;
use ztnd_core::io::build_output_path;
use ztnd_core::{BuildOptions, GraphMode, NodeLinkData, build, layout};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Capture file to read: a cached list of completions with logprobs,
    // or a plain list of sequences
    let capture_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./data/completions.json".to_owned());

    // Every choice of every completion becomes one sequence
    // A choice without logprobs aborts the whole run
    let sequences = load_sequences(&capture_path)?;
    info!("loaded {} sequences from {}", sequences.len(), capture_path);

    // Build the three graphs from the same sequences
    for mode in GraphMode::ALL {
        // Provenance (which sequences went through each node) is useful for
        // hover text but makes files much bigger
        let options = BuildOptions::new(mode).with_provenance(true);
        let graph = build(&sequences, &options)?;

        // Positional graphs are laid out from ROOT, the token graph from
        // the first token of the first sequence
        let Some(root) = graph.default_root() else {
            warn!("{mode}: nothing to lay out");
            continue;
        };
        let layout = layout(&graph, root)?;
        if !layout.unreachable().is_empty() {
            // Only possible in token mode: cycles and other first tokens
            warn!("{mode}: {} nodes not reachable from the root", layout.unreachable().len());
        }

        // Write JSON for charting tools and a compact postcard snapshot
        let data = NodeLinkData::new(&graph, Some(&layout));
        let json_path = build_output_path(&capture_path, &format!("{mode}.json"))?;
        let bin_path = build_output_path(&capture_path, &format!("{mode}.bin"))?;
        data.write_json(&json_path)?;
        data.write_bytes(&bin_path)?;

        println!(
            "{mode}: {} nodes, {} edges, {} positioned -> {}",
            graph.node_count(),
            graph.edge_count(),
            layout.len(),
            json_path.display()
        );
    }

    Ok(())
}
