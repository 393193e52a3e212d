use amalgam::{BasicEntity, CandidateSummary, ExtractResult, ResultEntity};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(res: &ExtractResult, color: bool) {
    let palette = ansi::Palette::new(color);
    let details = &res.details;
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Message: \"{}\"", res.text), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Projection ━━━", ansi::GRAY));
    println!("  {}", details.projected_text);
    for entity in &details.skipped {
        println!("  {} {}", palette.paint("skipped (overlap):", ansi::YELLOW), fmt_basic(entity, &palette));
    }

    println!("\n{}", palette.paint("━━━ Candidates ━━━", ansi::GRAY));
    if details.candidates.is_empty() {
        println!("{}", palette.dim("  No pattern matched"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • No pattern references the entity types present");
        println!("  • Literal text between placeholders differs from the message");
        println!("  • Overlapping entities were skipped during projection");
        println!("\n{}", palette.dim("  Tip: Set AMALGAM_LOG=amalgam=trace to see every matching decision"));
    } else {
        print_candidates(&details.candidates, &palette);
    }
    if !details.gated_patterns.is_empty() {
        println!(
            "  {} {}",
            palette.dim("gated:"),
            palette.dim(details.gated_patterns.iter().map(|p| format!("\"{p}\"")).collect::<Vec<_>>().join(", "))
        );
    }

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    print_results(&res.results, &palette);

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Projection: {}  │  Matching: {}  │  Resolve: {}",
        palette.paint(format!("{:?}", details.metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", details.metrics.projection)),
        palette.paint(format!("{:?}", details.metrics.matching), ansi::CYAN),
        palette.dim(format!("{:?}", details.metrics.resolve)),
    );
    println!();
}

fn print_candidates(candidates: &[CandidateSummary], palette: &ansi::Palette) {
    for (idx, c) in candidates.iter().enumerate() {
        let verdict = if c.accepted { palette.paint("✓", ansi::GREEN) } else { palette.dim("✗") };
        println!(
            "  {} {} {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            verdict,
            palette.paint(&c.name, ansi::BLUE),
            palette.paint(format!("span {}..{}", c.start, c.end), ansi::YELLOW),
            palette.dim(format!("\"{}\" (len {})", c.pattern, c.source_length)),
        );
    }
}

fn print_results(results: &[ResultEntity], palette: &ansi::Palette) {
    if results.is_empty() {
        println!("{}", palette.dim("  No entities"));
        return;
    }
    for r in results {
        match r {
            ResultEntity::Composite(c) => {
                println!(
                    "  {} {} {}",
                    palette.bold(palette.paint(&c.name, ansi::MAGENTA)),
                    palette.paint(format!("span {}..{}", c.start, c.end), ansi::YELLOW),
                    palette.dim(format!("│ {}", c.source)),
                );
                for member in &c.members {
                    println!("      {}", fmt_basic(member, palette));
                }
            }
            ResultEntity::Basic(b) => println!("  {}", fmt_basic(b, palette)),
        }
    }
}

fn fmt_basic(entity: &BasicEntity, palette: &ansi::Palette) -> String {
    let value = match entity.value.as_str() {
        Some(s) => s.to_string(),
        None => entity.value.to_string(),
    };
    format!(
        "{} {} {}",
        palette.paint(&entity.label, ansi::BLUE),
        palette.paint(format!("{}..{}", entity.start, entity.end), ansi::YELLOW),
        palette.bold(value),
    )
}
