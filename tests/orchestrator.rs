//! Map-reduce and direct analysis pipelines, driven with fake collaborators.

mod common;

use common::{FakeGateway, FakeSummarizer, collect, orchestrator};
use qualia::api::enums::{AnalysisType, Mode};
use qualia::orchestrator::{AnalysisRequest, EMPTY_CONTEXT_MESSAGE, SUMMARY_SEPARATOR};
use qualia::prompts::PromptRegistry;

/// Partial summary the fake summarizer's failure turns into.
const FAILED_CHUNK_MARKER: &str = "Erreur d'analyse: summarizer: boom";

fn request(analysis_type: AnalysisType, context: &str, mode: Mode) -> AnalysisRequest {
    AnalysisRequest {
        analysis_type,
        context: context.to_string(),
        mode,
        model_choice: "auto".to_string(),
    }
}

#[tokio::test]
async fn local_snapshots_only_grow() {
    let gateway = FakeGateway::new(&["Synth", "èse ", "finale."]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "x".repeat(7000);
    let out = collect(orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Local))).await;

    assert!(out.len() > 3);
    for pair in out.windows(2) {
        assert!(
            pair[1].starts_with(&pair[0]),
            "snapshot shrank: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }

    let last = out.last().unwrap();
    assert!(last.starts_with("Mode Local sélectionné."));
    assert!(last.contains("Document découpé en 3 morceaux."));
    assert!(last.contains("  - Traitement du morceau 3/3...\n"));
    assert!(last.ends_with("Synthèse finale."));
}

#[tokio::test]
async fn local_makes_one_reduce_call_after_every_chunk() {
    let gateway = FakeGateway::new(&["ok"]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "y".repeat(7000);
    collect(orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Local))).await;

    assert_eq!(summarizer.calls(), 3);
    assert_eq!(gateway.calls(), 1);

    let inputs = summarizer.inputs();
    assert_eq!(inputs[0].chars().count(), 3000);
    assert_eq!(inputs[2].chars().count(), 1600);

    let prompt = &gateway.requests()[0];
    assert!(prompt.question.is_empty());
    assert_eq!(prompt.mode, Mode::Local);
    assert_eq!(prompt.model_choice, "auto");
    assert!(prompt.context.contains("résumé 1 (40-200)"));
    assert!(prompt.context.contains("résumé 3 (40-200)"));
}

#[tokio::test]
async fn failed_chunk_leaves_an_inline_marker_and_continues() {
    let gateway = FakeGateway::new(&["fin"]);
    let summarizer = FakeSummarizer::failing_on(&[2]);
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "z".repeat(7000);
    let out = collect(orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Local))).await;

    assert_eq!(summarizer.calls(), 3);
    assert_eq!(gateway.calls(), 1);
    let prompt = &gateway.requests()[0].context;
    let expected = [
        "résumé 1 (40-200)",
        FAILED_CHUNK_MARKER,
        "résumé 3 (40-200)",
    ]
    .join(SUMMARY_SEPARATOR);
    assert!(prompt.contains(&expected));

    let last = out.last().unwrap();
    assert!(last.contains("    -> Erreur sur le morceau 2.\n"));
    assert_eq!(last.matches("    -> Terminé.\n").count(), 2);
}

#[tokio::test]
async fn partial_summaries_match_chunk_count() {
    let gateway = FakeGateway::new(&[]);
    let summarizer = FakeSummarizer::failing_on(&[1, 4]);
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    // 12_000 chars at 3000/300 gives 5 windows.
    let context = "w".repeat(12_000);
    collect(orch.analyze(request(AnalysisType::SuiviEvaluation, &context, Mode::Local))).await;

    let expected = orch.chunking().split(&context).len();
    assert_eq!(expected, 5);
    assert_eq!(summarizer.calls(), expected);
    assert_eq!(gateway.calls(), 1);

    let prompt = &gateway.requests()[0].context;
    assert_eq!(prompt.matches(SUMMARY_SEPARATOR).count(), expected - 1);
}

#[tokio::test]
async fn every_chunk_failing_still_reduces_once() {
    let gateway = FakeGateway::new(&["rien"]);
    let summarizer = FakeSummarizer::failing_on(&[1, 2, 3]);
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "f".repeat(7000);
    let out = collect(orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Local))).await;

    assert_eq!(summarizer.calls(), 3);
    assert_eq!(gateway.calls(), 1);

    let combined = [FAILED_CHUNK_MARKER; 3].join(SUMMARY_SEPARATOR);
    let prompt = &gateway.requests()[0].context;
    assert_eq!(
        prompt,
        &PromptRegistry::builtin().render("resume_general", &combined)
    );
    assert_eq!(prompt.matches(FAILED_CHUNK_MARKER).count(), 3);

    let last = out.last().unwrap();
    assert!(!last.contains("    -> Terminé.\n"));
    assert!(last.ends_with("rien"));
}

#[tokio::test]
async fn short_context_is_one_chunk() {
    let gateway = FakeGateway::new(&["r"]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let out = collect(orch.analyze(request(
        AnalysisType::AnalyseOpinions,
        "Un court entretien.",
        Mode::Local,
    )))
    .await;

    assert_eq!(summarizer.inputs(), vec!["Un court entretien.".to_string()]);
    assert!(out.last().unwrap().contains("Document découpé en 1 morceaux."));
    assert_eq!(
        gateway.requests()[0].context,
        PromptRegistry::builtin().render("analyse_opinions", "résumé 1 (40-200)")
    );
}

#[tokio::test]
async fn empty_context_yields_single_message_without_calls() {
    for mode in [Mode::Local, Mode::Api] {
        let gateway = FakeGateway::new(&["never"]);
        let summarizer = FakeSummarizer::new();
        let orch = orchestrator(gateway.clone(), summarizer.clone());

        let out = collect(orch.analyze(request(AnalysisType::ResumeGeneral, "  \n\t ", mode))).await;

        assert_eq!(out, vec![EMPTY_CONTEXT_MESSAGE.to_string()], "mode {mode}");
        assert_eq!(summarizer.calls(), 0);
        assert_eq!(gateway.calls(), 0);
    }
}

#[tokio::test]
async fn api_mode_passes_tokens_through_raw() {
    let gateway = FakeGateway::new(&["Bon", "jour", " !"]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "c".repeat(7000);
    let out = collect(orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Api))).await;

    assert_eq!(
        out,
        vec![
            "Mode API sélectionné. Envoi du document complet...\n\n".to_string(),
            "Bon".to_string(),
            "jour".to_string(),
            " !".to_string(),
        ]
    );
    assert_eq!(summarizer.calls(), 0);
    assert_eq!(gateway.calls(), 1);

    let req = &gateway.requests()[0];
    assert_eq!(req.mode, Mode::Api);
    assert_eq!(
        req.context,
        PromptRegistry::builtin().render("resume_general", &context)
    );
}

#[tokio::test]
async fn unknown_analysis_key_uses_general_template() {
    let gateway = FakeGateway::new(&[]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let analysis_type = AnalysisType::from_key("not_a_real_type");
    collect(orch.analyze(request(analysis_type, "texte", Mode::Api))).await;

    assert_eq!(
        gateway.requests()[0].context,
        PromptRegistry::builtin().render("resume_general", "texte")
    );
}

#[test]
fn streams_are_lazy_until_polled() {
    let gateway = FakeGateway::new(&["t"]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let stream = orch.analyze(request(AnalysisType::ResumeGeneral, "abc", Mode::Local));
    assert_eq!(summarizer.calls(), 0);
    assert_eq!(gateway.calls(), 0);

    let out = tokio_test::block_on(collect(stream));
    assert_eq!(summarizer.calls(), 1);
    assert_eq!(gateway.calls(), 1);
    assert!(out.last().unwrap().ends_with('t'));
}

#[tokio::test]
async fn dropping_the_stream_stops_the_pipeline() {
    use futures_util::StreamExt;

    let gateway = FakeGateway::new(&["x"]);
    let summarizer = FakeSummarizer::new();
    let orch = orchestrator(gateway.clone(), summarizer.clone());

    let context = "d".repeat(30_000);
    let mut stream = orch.analyze(request(AnalysisType::ResumeGeneral, &context, Mode::Local));
    // Banner, step 1, chunk count, step 2, first "Traitement", first "Terminé".
    for _ in 0..6 {
        stream.next().await.unwrap();
    }
    drop(stream);

    assert_eq!(summarizer.calls(), 1);
    assert_eq!(gateway.calls(), 0);
}
