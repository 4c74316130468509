//! # Classificadores de Entropia Máxima
//!
//! O pipeline só depende de um contrato: dada uma sequência de features, devolver o
//! rótulo mais provável e sua probabilidade ([`Classifier`]). Duas implementações:
//!
//! - [`GisModel`]: lê o formato texto de modelos GIS (Generalized Iterative Scaling)
//!   gravado pelo OpenNLP/SharpEntropy e avalia-o sem treino.
//! - [`MaxEntModel`]: regressão logística multinomial treinada com SGD e regularização
//!   L2, persistida em JSON.
//!
//! Em ambos: $$ P(y|x) = \frac{\exp(\sum_i w_i \cdot f_i(x,y))}{Z(x)} $$

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NeraError, Result};
use crate::training::TrainingEvent;

/// Melhor rótulo e sua probabilidade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub label: String,
    pub probability: f64,
}

/// Contrato de classificação. Implementações são somente leitura e compartilháveis
/// entre threads sem trava.
pub trait Classifier: Send + Sync {
    /// Avalia as features. `None` apenas para modelos sem nenhum rótulo.
    fn score(&self, features: &[String]) -> Option<Score>;

    /// Rótulos conhecidos pelo modelo.
    fn labels(&self) -> Vec<String>;
}

/// Escolhe o primeiro índice de maior probabilidade.
fn best_of(labels: &[String], probs: &[f64]) -> Option<Score> {
    let (idx, p) = probs
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })?;
    Some(Score {
        label: labels.get(idx)?.clone(),
        probability: p,
    })
}

// =====================================================================
// Modelo GIS (formato texto)
// =====================================================================

/// Modelo GIS carregado de arquivo texto.
///
/// Layout do arquivo, um valor por linha:
///
/// ```text
/// GIS
/// <constante de correção>
/// <parâmetro de correção>
/// <n rótulos>      seguido dos rótulos
/// <n padrões>      cada linha: "<n predicados> <id rótulo> <id rótulo> ..."
/// <n predicados>   seguido dos nomes
/// <parâmetros>     um por (predicado, rótulo do seu padrão), na ordem dos padrões
/// ```
#[derive(Debug, Clone)]
pub struct GisModel {
    outcomes: Vec<String>,
    /// predicado → [(id do rótulo, peso)]
    params: HashMap<String, Vec<(usize, f64)>>,
    correction_constant: f64,
    correction_param: f64,
}

struct LineReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    fn next(&mut self) -> Result<String> {
        self.line_no += 1;
        match self.lines.next() {
            Some(line) => Ok(line?.trim().to_string()),
            None => Err(NeraError::model(self.line_no, "fim de arquivo inesperado")),
        }
    }

    fn parse<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let line = self.next()?;
        line.parse()
            .map_err(|_| NeraError::model(self.line_no, format!("{what} inválido: {line:?}")))
    }
}

impl GisModel {
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let model = Self::from_reader(std::io::BufReader::new(file))?;
        info!(path = %path.display(), outcomes = model.outcomes.len(), predicates = model.params.len(), "modelo GIS carregado");
        Ok(model)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut r = LineReader {
            lines: reader.lines(),
            line_no: 0,
        };

        let header = r.next()?;
        if header != "GIS" {
            return Err(NeraError::model(r.line_no, format!("esperava cabeçalho GIS, veio {header:?}")));
        }
        let correction_constant: f64 = r.parse::<i64>("constante de correção")? as f64;
        let correction_param: f64 = r.parse("parâmetro de correção")?;

        let n_outcomes: usize = r.parse("número de rótulos")?;
        if n_outcomes == 0 {
            return Err(NeraError::model(r.line_no, "modelo sem rótulos"));
        }
        let outcomes = (0..n_outcomes).map(|_| r.next()).collect::<Result<Vec<_>>>()?;

        let n_patterns: usize = r.parse("número de padrões")?;
        let mut patterns: Vec<(usize, Vec<usize>)> = Vec::with_capacity(n_patterns);
        for _ in 0..n_patterns {
            let line = r.next()?;
            let nums = line
                .split_whitespace()
                .map(|n| n.parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| NeraError::model(r.line_no, format!("padrão inválido: {line:?}")))?;
            let (count, ids) = nums
                .split_first()
                .ok_or_else(|| NeraError::model(r.line_no, "padrão vazio"))?;
            if let Some(bad) = ids.iter().find(|&&id| id >= n_outcomes) {
                return Err(NeraError::model(r.line_no, format!("rótulo {bad} fora do intervalo")));
            }
            patterns.push((*count, ids.to_vec()));
        }

        let n_predicates: usize = r.parse("número de predicados")?;
        let expected: usize = patterns.iter().map(|(count, _)| count).sum();
        if expected != n_predicates {
            return Err(NeraError::model(
                r.line_no,
                format!("padrões cobrem {expected} predicados, arquivo declara {n_predicates}"),
            ));
        }
        let predicates = (0..n_predicates).map(|_| r.next()).collect::<Result<Vec<_>>>()?;

        let mut params = HashMap::with_capacity(n_predicates);
        let mut pred_iter = predicates.into_iter();
        for (count, ids) in &patterns {
            for _ in 0..*count {
                let name = pred_iter
                    .next()
                    .ok_or_else(|| NeraError::model(r.line_no, "predicados insuficientes"))?;
                let mut weights = Vec::with_capacity(ids.len());
                for &id in ids {
                    weights.push((id, r.parse::<f64>("parâmetro")?));
                }
                params.insert(name, weights);
            }
        }

        Ok(Self {
            outcomes,
            params,
            correction_constant,
            correction_param,
        })
    }

    /// Distribuição de probabilidade sobre os rótulos, na ordem de [`Classifier::labels`].
    pub fn eval(&self, context: &[String]) -> Vec<f64> {
        let n = self.outcomes.len();
        let mut sums = vec![0.0; n];
        let mut active = vec![0usize; n];

        for predicate in context {
            if let Some(weights) = self.params.get(predicate) {
                for &(oid, w) in weights {
                    sums[oid] += w;
                    active[oid] += 1;
                }
            }
        }

        let constant_inverse = if self.correction_constant > 0.0 {
            1.0 / self.correction_constant
        } else {
            1.0
        };
        let logits: Vec<f64> = (0..n)
            .map(|oid| {
                let mut logit = sums[oid] * constant_inverse;
                if self.correction_param != 0.0 && self.correction_constant > 0.0 {
                    logit += (1.0 - active[oid] as f64 / self.correction_constant) * self.correction_param;
                }
                logit
            })
            .collect();
        softmax(&logits)
    }
}

impl Classifier for GisModel {
    fn score(&self, features: &[String]) -> Option<Score> {
        best_of(&self.outcomes, &self.eval(features))
    }

    fn labels(&self) -> Vec<String> {
        self.outcomes.clone()
    }
}

// =====================================================================
// MaxEnt treinável (SGD)
// =====================================================================

/// Modelo de Entropia Máxima, também conhecido como Regressão Logística Multinomial.
///
/// Discriminativo: modela $P(y|x)$ diretamente e aceita features arbitrárias e
/// sobrepostas, como as de contexto e de forma geradas para cada entidade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxEntModel {
    /// Pesos $w_{feature, tag}$: feature → (tag → peso).
    weights: HashMap<String, HashMap<String, f64>>,
    /// Lista de todas as tags possíveis (labels de classe), ordenada.
    tags: Vec<String>,
}

impl MaxEntModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treina o modelo usando **Stochastic Gradient Descent (SGD)**.
    ///
    /// # Parâmetros
    /// * `events` - Eventos de treino (features + tipo correto).
    /// * `iterations` - Número de épocas.
    /// * `learning_rate` ($\eta$) - Tamanho do passo do gradiente.
    /// * `lambda` ($\lambda$) - Regularização L2.
    pub fn train(&mut self, events: &[TrainingEvent], iterations: usize, learning_rate: f64, lambda: f64) -> Result<()> {
        if events.is_empty() {
            return Err(NeraError::Training("nenhum evento de treino".into()));
        }

        let tag_set: HashSet<&str> = events.iter().map(|e| e.outcome.as_str()).collect();
        self.tags = tag_set.into_iter().map(str::to_string).collect();
        self.tags.sort();

        for epoch in 0..iterations {
            let mut correct = 0;

            for event in events {
                let probs = self.probabilities(&event.context);
                if best_of(&self.tags, &probs).map(|s| s.label == event.outcome).unwrap_or(false) {
                    correct += 1;
                }

                // w = w + rate * (indicador_classe_correta - prob_predita - lambda * w)
                for (tag_idx, tag) in self.tags.iter().enumerate() {
                    let indicator = if *tag == event.outcome { 1.0 } else { 0.0 };
                    let error = indicator - probs[tag_idx];
                    if error.abs() <= 1e-6 {
                        continue;
                    }
                    for feature in &event.context {
                        let per_tag = self.weights.entry(feature.clone()).or_default();
                        let current = per_tag.get(tag).copied().unwrap_or(0.0);
                        let updated = current + learning_rate * (error - lambda * current);
                        if updated.abs() > 1e-9 {
                            per_tag.insert(tag.clone(), updated);
                        } else {
                            per_tag.remove(tag);
                        }
                    }
                }
            }

            debug!(
                epoch,
                accuracy = correct as f64 / events.len() as f64,
                "época de treino MaxEnt"
            );
        }

        self.weights.retain(|_, per_tag| !per_tag.is_empty());
        Ok(())
    }

    /// Distribuição sobre `tags` para um contexto.
    pub fn probabilities(&self, context: &[String]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .tags
            .iter()
            .map(|tag| {
                context
                    .iter()
                    .filter_map(|f| self.weights.get(f).and_then(|per_tag| per_tag.get(tag)))
                    .sum()
            })
            .collect();
        softmax(&scores)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let model: MaxEntModel = serde_json::from_str(&fs::read_to_string(path)?)?;
        if model.tags.is_empty() {
            return Err(NeraError::model(0, "modelo MaxEnt sem rótulos"));
        }
        Ok(model)
    }
}

impl Classifier for MaxEntModel {
    fn score(&self, features: &[String]) -> Option<Score> {
        best_of(&self.tags, &self.probabilities(features))
    }

    fn labels(&self) -> Vec<String> {
        self.tags.clone()
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Carrega um classificador, detectando o formato: cabeçalho `GIS` ou JSON do [`MaxEntModel`].
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>> {
    let text = fs::read_to_string(path)?;
    let is_gis = text.lines().map(str::trim).find(|l| !l.is_empty()) == Some("GIS");
    if is_gis {
        let model = GisModel::from_reader(std::io::Cursor::new(text))?;
        info!(path = %path.display(), labels = ?model.labels(), "classificador GIS");
        Ok(Arc::new(model))
    } else {
        let model = MaxEntModel::load(path)?;
        info!(path = %path.display(), labels = ?model.labels(), "classificador MaxEnt (JSON)");
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Dois rótulos; `firstIsUpper` puxa para PERSON, `firstIsDigit` para DATE.
    const GIS_MODEL: &str = "GIS\n1\n0.0\n2\nPERSON\nDATE\n2\n1 0\n2 0 1\n3\nfirstIsUpper\nfirstIsDigit\nno_digit\n2.0\n-1.0\n3.0\n0.5\n0.1\n";

    fn ctx(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_gis_load_and_score() {
        let model = GisModel::from_reader(Cursor::new(GIS_MODEL)).unwrap();
        assert_eq!(model.labels(), vec!["PERSON", "DATE"]);

        let s = model.score(&ctx(&["firstIsUpper", "no_digit"])).unwrap();
        assert_eq!(s.label, "PERSON");
        // logits: PERSON = 2.0 + 0.5, DATE = 0.1
        let expected = 2.5f64.exp() / (2.5f64.exp() + 0.1f64.exp());
        assert!((s.probability - expected).abs() < 1e-9);

        let s = model.score(&ctx(&["firstIsDigit"])).unwrap();
        assert_eq!(s.label, "DATE");
    }

    #[test]
    fn test_gis_unknown_features_uniform() {
        let model = GisModel::from_reader(Cursor::new(GIS_MODEL)).unwrap();
        let probs = model.eval(&ctx(&["nunca_visto"]));
        assert!((probs[0] - 0.5).abs() < 1e-9);
        // Empate: vence o primeiro rótulo
        assert_eq!(model.score(&ctx(&[])).unwrap().label, "PERSON");
    }

    #[test]
    fn test_gis_malformed() {
        let err = GisModel::from_reader(Cursor::new("QN\n")).unwrap_err();
        assert!(matches!(err, NeraError::Model { line: 1, .. }));

        let truncated = "GIS\n1\n0.0\n2\nPERSON\n";
        assert!(GisModel::from_reader(Cursor::new(truncated)).is_err());

        let bad_outcome = "GIS\n1\n0.0\n1\nPERSON\n1\n1 3\n1\nf\n1.0\n";
        assert!(GisModel::from_reader(Cursor::new(bad_outcome)).is_err());
    }

    #[test]
    fn test_maxent_simple_learning() {
        let events = vec![
            TrainingEvent { context: ctx(&["first", "firstIsUpper", "single_word"]), outcome: "PERSON".into() },
            TrainingEvent { context: ctx(&["notFirst", "prevToken=la", "firstIsUpper"]), outcome: "LOCATION".into() },
            TrainingEvent { context: ctx(&["firstIsDigit", "contains_digit", "multi_word"]), outcome: "DATE".into() },
        ];

        let mut model = MaxEntModel::new();
        model.train(&events, 30, 0.2, 0.001).unwrap();

        assert_eq!(model.score(&ctx(&["prevToken=la", "notFirst"])).unwrap().label, "LOCATION");
        assert_eq!(model.score(&ctx(&["firstIsDigit"])).unwrap().label, "DATE");
        let total: f64 = model.probabilities(&ctx(&["first"])).iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_maxent_requires_events() {
        assert!(MaxEntModel::new().train(&[], 5, 0.1, 0.0).is_err());
        assert!(MaxEntModel::new().score(&ctx(&["x"])).is_none());
    }

    #[test]
    fn test_load_classifier_sniffs_format() {
        let dir = std::env::temp_dir().join(format!("nera-model-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let gis_path = dir.join("roModel.txt");
        fs::write(&gis_path, GIS_MODEL).unwrap();
        let gis = load_classifier(&gis_path).unwrap();
        assert_eq!(gis.labels(), vec!["PERSON", "DATE"]);

        let mut maxent = MaxEntModel::new();
        maxent
            .train(&[TrainingEvent { context: ctx(&["first"]), outcome: "PERSON".into() }], 2, 0.1, 0.0)
            .unwrap();
        let json_path = dir.join("model.json");
        maxent.save(&json_path).unwrap();
        let loaded = load_classifier(&json_path).unwrap();
        assert_eq!(loaded.labels(), vec!["PERSON"]);

        fs::remove_dir_all(&dir).ok();
    }
}
