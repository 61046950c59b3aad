//! Prompt construction for the generative backend.
//!
//! The system prompt frames the model as an interpretive code-transformer;
//! the user prompt carries the selected fragments, the seed and entropy
//! dial, and the JSON output contract.

use crate::models::Candidate;

/// System instruction defining the transformer role and constraints.
pub fn build_system_prompt() -> String {
    r#"## Core LLM Prompt

**Role & Intent**

You are an interpretive code-transformer working at the intersection of software archaeology and generative art.

You are an experimental code artist for a project called code-lanscrap.
Transform discarded source fragments into a coherent code-poem artifact, as a conceptual artifacts rather than a software utility.
Transformation including but not limiting to reorder/slice/mutate/reinterpret/permutate/recompose, w/ minimal external intervention.
Make your best effort to have the output (or part of the output) somehow executable.

**Task**

You will receive **deprecated, overwritten, or discarded source code** (e.g. fragments scraped from GitHub, abandoned commits, commented-out logic, or obsolete APIs).
Your task is to **recompose** this material into a **new, coherent program or conceptual artifact**.

**Constraints**

1. **Do not restore original intent**
   Do not "fix" the code back to what it used to do. Treat it as cultural residue, not a bug report.

2. **Preserve traces of decay**
   Keep variable names, stylistic quirks, obsolete patterns, and structural oddities where possible.

3. **Transform, don't summarize**
   The output must be executable or structurally valid in *some* programming language, but its purpose may be poetic, speculative, or conceptual.

4. **Meaning through permutation**
   Reorder, splice, mutate, and reinterpret fragments so that a new logic emerges: conceptual, aesthetic, or metaphorical.

5. **Minimal external invention**
   You may add glue code only when necessary for coherence. Prefer recombination over invention.

**Output Format**

1. **Recomposed Code**
   A single self-contained program or module.

2. **Interpretive Commentary (<=150 words)**
   Explain:

   * What kind of "meaning" emerged
   * How the discarded nature of the code shaped the transformation

**Tone**

Treat the source code as an artifact, not a mistake.
"#
    .to_string()
}

/// Build the user prompt: rules, seed/entropy header, output contract, and
/// one block per fragment.
pub fn build_user_prompt(fragments: &[Candidate], entropy: f64, seed: u64) -> String {
    let blocks: Vec<String> = fragments
        .iter()
        .enumerate()
        .map(|(idx, fragment)| {
            format!(
                "Fragment {}\nrepo: {}\ncommit: {}\nfile: {}:{}\nlang: {}\ntext: {}",
                idx + 1,
                fragment.repo_name,
                fragment.commit_hash,
                fragment.file_path,
                fragment.line_no,
                fragment.language,
                fragment.content,
            )
        })
        .collect();

    let payload = blocks.join("\n\n");

    let output_contract = serde_json::json!({
        "title": "string",
        "language": "string",
        "artifact_code": "string",
        "artist_statement": "string",
        "transform_notes": "string",
    });

    format!(
        "Create one artwork from these code fragments.\n\
         Seed: {}\n\
         Entropy dial (0=archival, 1=surreal): {:.2}\n\n\
         Rules:\n\
         1) Keep traceable lineage by preserving at least 8 exact tokens from source fragments.\n\
         2) Rearrange and permute the materials into a piece that feels intentional.\n\
         3) artifact_code can be executable-like or pseudo-code, but must feel structurally coherent.\n\
         4) No markdown fences in JSON values.\n\
         5) Return valid JSON only with exactly this schema:\n\
         {}\n\n\
         Fragments:\n\
         {}\n",
        seed, entropy, output_contract, payload
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, content: &str) -> Candidate {
        Candidate {
            id,
            repo_name: "demo".to_string(),
            commit_hash: "cafebabe".to_string(),
            file_path: "src/old.py".to_string(),
            language: "python".to_string(),
            line_no: 7,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_system_prompt_frames_the_transformer_role() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("interpretive code-transformer"));
        assert!(prompt.contains("Do not restore original intent"));
    }

    #[test]
    fn test_user_prompt_embeds_fragments_and_parameters() {
        let fragments = vec![
            candidate(1, "def a(x): return x"),
            candidate(2, "SELECT id FROM artifacts;"),
        ];

        let prompt = build_user_prompt(&fragments, 0.55, 42);

        assert!(prompt.contains("Seed: 42"));
        assert!(prompt.contains("Entropy dial (0=archival, 1=surreal): 0.55"));
        assert!(prompt.contains("Fragment 1"));
        assert!(prompt.contains("Fragment 2"));
        assert!(prompt.contains("file: src/old.py:7"));
        assert!(prompt.contains("text: def a(x): return x"));
        assert!(prompt.contains("\"artifact_code\""));
    }

    #[test]
    fn test_user_prompt_with_no_fragments_still_carries_contract() {
        let prompt = build_user_prompt(&[], 0.0, 1);
        assert!(prompt.contains("Return valid JSON only"));
        assert!(prompt.ends_with("Fragments:\n\n"));
    }
}
