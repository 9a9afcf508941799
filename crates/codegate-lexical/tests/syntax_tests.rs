use codegate_filemap::{FileMap, SandboxPath};
use codegate_lexical::{scan, validate, validate_all, SyntaxIssue};
use proptest::prelude::*;

const BALANCED_SNIPPETS: &[&str] = &[
    "export const a = 1;\n",
    "function f(x) { return [x, x]; }\n",
    "const t = `n = ${n}`;\n",
    "const s = 'it\\'s';\n",
    "// note {\n",
    "if (a < b) { call(a); }\n",
];

fn balanced_prefix() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(BALANCED_SNIPPETS), 1..6)
        .prop_map(|parts| parts.concat())
}

#[test]
fn test_realistic_component_passes() {
    let source = r#"import { useState } from "react";

export default function Hero({ title }: { title: string }) {
  const [open, setOpen] = useState<boolean>(false);
  const label = `Show ${open ? "less" : "more"}`;
  return (
    <section className="hero">
      {/* headline */}
      <h1>{title}</h1>
      <img src="/hero.png" alt="" />
      <br>
      {open && <p className="copy">More to come</p>}
      <button onClick={() => setOpen(!open)}>{label}</button>
    </section>
  );
}
"#;
    let path = SandboxPath::normalize("/storefront/Hero.tsx").unwrap();
    assert_eq!(validate(source, &path), None);
}

#[test]
fn test_first_failing_file_reasons_are_specific() {
    let files = FileMap::from_raw_pairs([
        ("/storefront/A.ts", "export const a = (1 + 2;"),
        ("/storefront/B.ts", "export const b = 1;\n)"),
        ("/storefront/C.tsx", "export const C = () => <div>;"),
    ])
    .unwrap();

    let report = validate_all(&files);

    assert_eq!(report.errors.len(), 3);
    assert!(matches!(report.errors[0].1, SyntaxIssue::Imbalance { delta: 1, .. }));
    assert!(matches!(report.errors[1].1, SyntaxIssue::UnexpectedCloser { line: 2, .. }));
    assert_eq!(report.errors[2].1, SyntaxIssue::UnclosedTags { count: 1 });
}

proptest! {
    #[test]
    fn prop_odd_backticks_report_unterminated_template(
        prefix in balanced_prefix(),
        suffix in "[a-zA-Z0-9 {}()\\[\\];,.=+<>\n]{0,40}",
    ) {
        let content = format!("{prefix}const broken = `{suffix}");
        prop_assert!(scan(&content).template_delimiters() % 2 == 1);

        let files = FileMap::from_raw_pairs([("/storefront/Broken.ts", content.as_str())]).unwrap();
        let report = validate_all(&files);
        prop_assert_eq!(report.errors.len(), 1);
        prop_assert_eq!(&report.errors[0].1, &SyntaxIssue::UnterminatedTemplate);
    }

    #[test]
    fn prop_balanced_snippets_pass(prefix in balanced_prefix()) {
        let path = SandboxPath::normalize("/storefront/ok.ts").unwrap();
        prop_assert_eq!(validate(&prefix, &path), None);
    }
}
