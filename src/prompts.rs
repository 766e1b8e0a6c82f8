use std::collections::HashMap;

use crate::api::enums::AnalysisType;
use crate::error::QualiaError;

/// Substitution point every analysis template must contain.
pub const SUMMARIES_SLOT: &str = "{summaries}";

const RESUME_GENERAL: &str = "Ta mission est de créer une synthèse globale et structurée à partir des résumés partiels d'un long document. Commence par une introduction présentant le sujet principal, puis développe les 3 à 5 thèmes les plus importants en te basant sur le contenu fourni, et termine par une conclusion générale.

Voici les résumés partiels à utiliser comme source unique :
{summaries}

Rédige maintenant la **synthèse globale et structurée**.";

const SUIVI_EVALUATION: &str = "Agis en tant qu'expert en Suivi-Évaluation. En te basant sur les résumés du rapport ci-dessous, identifie les principales recommandations formulées, les risques mentionnés, et les leçons apprises. Structure ta réponse en trois sections claires avec des titres : Recommandations, Risques, et Leçons Apprises.

Voici les résumés partiels à utiliser comme source unique :
{summaries}

Rédige maintenant ton **analyse de Suivi-Évaluation**.";

const ANALYSE_OPINIONS: &str = "Tu es un sociologue spécialisé dans l'analyse de discours. Analyse les résumés d'entretiens fournis ci-dessous. Identifie et regroupe les opinions positives et les opinions négatives exprimées par les participants concernant le projet. Présente le résultat sous forme de deux listes à puces distinctes, avec les titres \"Points Positifs\" et \"Points Négatifs\".

Voici les résumés partiels des entretiens :
{summaries}

Rédige maintenant ton **analyse d'opinions**.";

/// Analysis-type → template registry. Built once at startup and shared
/// read-only across requests.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: HashMap<AnalysisType, String>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptRegistry {
    pub fn builtin() -> Self {
        let templates = HashMap::from([
            (AnalysisType::ResumeGeneral, RESUME_GENERAL.to_string()),
            (AnalysisType::SuiviEvaluation, SUIVI_EVALUATION.to_string()),
            (AnalysisType::AnalyseOpinions, ANALYSE_OPINIONS.to_string()),
        ]);
        Self { templates }
    }

    /// Builtin templates with per-key replacements from configuration.
    /// Rejects unknown keys and templates without the summaries slot.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self, QualiaError> {
        let mut registry = Self::builtin();
        for (key, template) in overrides {
            let analysis_type = AnalysisType::from_config_key(key)
                .ok_or_else(|| QualiaError::Config(format!("unknown analysis type in prompts: {key}")))?;
            if !template.contains(SUMMARIES_SLOT) {
                return Err(QualiaError::Config(format!(
                    "prompt for {key} is missing the {SUMMARIES_SLOT} slot"
                )));
            }
            registry.templates.insert(analysis_type, template.clone());
        }
        Ok(registry)
    }

    pub fn template(&self, analysis_type: AnalysisType) -> &str {
        self.templates
            .get(&analysis_type)
            .or_else(|| self.templates.get(&AnalysisType::default()))
            .map(String::as_str)
            .unwrap_or(RESUME_GENERAL)
    }

    /// Render the template for `analysis_type` with `summaries` in its slot.
    /// Unknown keys use the general synthesis template.
    pub fn render(&self, analysis_type: &str, summaries: &str) -> String {
        self.render_for(AnalysisType::from_key(analysis_type), summaries)
    }

    pub fn render_for(&self, analysis_type: AnalysisType, summaries: &str) -> String {
        // str::replace scans the template only; the inserted text is never re-expanded.
        self.template(analysis_type).replace(SUMMARIES_SLOT, summaries)
    }
}

/// Q&A prompt used when a question accompanies the context.
pub fn question_prompt(context: &str, question: &str) -> String {
    format!(
        "Contexte:\n---\n{context}\n---\nBasé UNIQUEMENT sur le contexte, réponds à la question: {question}"
    )
}

/// Q&A prompt for reasoning models, which are asked to show their reasoning.
pub fn reasoning_prompt(context: &str, question: &str) -> String {
    format!(
        "En te basant sur le document suivant, réponds à ma demande de manière détaillée. Explique ton raisonnement.\n\n**Demande :** {question}\n\n**Document :**\n{context}\n\n**Réponse :**"
    )
}

/// Reasoning-tuned local models get the reasoning template.
pub fn is_reasoning_model(model: &str) -> bool {
    let lower = model.to_lowercase();
    lower.contains("phi") || lower.contains("deepseek")
}
