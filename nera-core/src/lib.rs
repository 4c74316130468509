//! # nera-core — Reconhecimento de Entidades Nomeadas sobre Texto Anotado
//!
//! Este crate recebe sentenças já anotadas linguisticamente (forma, lema, POS e chunk,
//! no formato XCES), detecta as menções a entidades, classifica cada uma com um modelo
//! de Entropia Máxima e devolve a sentença com as tags `ENAMEX`/`TIMEX` inseridas.
//!
//! ## Arquitetura do Sistema
//!
//! O sistema segue uma arquitetura de pipeline linear, uma sentença por vez:
//!
//! 1.  **Entrada**: marcação XCES ([`annotation`]), com dois pontos de vista derivados:
//!     tokens com POS (um por nó) e o fluxo cru (nós multipalavra divididos).
//! 2.  **Candidatos** ([`candidate`]): cascata ordenada de regras sobre POS, capitalização
//!     e chunk, com o agrupador de datas ([`date`]) rodando em paralelo.
//! 3.  **Alinhamento** ([`align`]): cada candidato é localizado no fluxo cru com um cursor
//!     que só avança.
//! 4.  **Features** ([`features`]) e **Classificação** ([`maxent`]): contexto, verbos
//!     principais vizinhos e forma do texto, avaliados por um modelo GIS ou MaxEnt.
//! 5.  **Saída** ([`serializer`]): a sentença com as entidades marcadas.
//!
//! O [`pipeline`] orquestra os passos e emite eventos; o [`document`] aplica o pipeline
//! a documentos inteiros, inclusive texto cru via [`services`] e [`segment`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use std::sync::Arc;
//! use nera_core::{Annotator, Classifier, LanguageResources, Score, SerializeOptions};
//!
//! struct Person;
//!
//! impl Classifier for Person {
//!     fn score(&self, _features: &[String]) -> Option<Score> {
//!         Some(Score { label: "PERSON".into(), probability: 1.0 })
//!     }
//!     fn labels(&self) -> Vec<String> {
//!         vec!["PERSON".into()]
//!     }
//! }
//!
//! let resources = Arc::new(LanguageResources::builtin("ro").unwrap());
//! let annotator = Annotator::new(resources, Arc::new(Person));
//!
//! let xml = r#"<w lemma="Ion" ana="Np">Ion</w><w lemma="pleca" ana="Vmis3s">pleacă</w>"#;
//! let result = annotator.annotate_markup(xml, &SerializeOptions::default());
//! assert_eq!(result.markup, r#"<ENAMEX TYPE="PERSON">Ion</ENAMEX> pleacă"#);
//! ```

pub mod align;
pub mod annotation;
pub mod candidate;
pub mod date;
pub mod document;
pub mod entity;
pub mod error;
pub mod features;
pub mod maxent;
pub mod pipeline;
pub mod resources;
pub mod segment;
pub mod serializer;
pub mod services;
pub mod training;

pub use annotation::{Node, Sentence};
pub use document::{DocumentAnnotation, DocumentProcessor, ProcessOptions};
pub use entity::{NamedEntity, Span};
pub use error::{NeraError, Result};
pub use maxent::{load_classifier, Classifier, GisModel, MaxEntModel, Score};
pub use pipeline::{Annotator, PipelineEvent, SentenceAnnotation};
pub use resources::LanguageResources;
pub use serializer::SerializeOptions;
pub use services::{DiacriticRestorer, Preprocessor};
