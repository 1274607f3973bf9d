/// Le contrat réseau, sans la couche transport : enveloppe de réponse,
/// DTOs REST, messages WebSocket et le service qui les sert. Le serveur
/// HTTP/WS réel (hors périmètre) ne fait que désérialiser, appeler
/// [`Api`] et renvoyer l'enveloppe.

pub mod api;
pub mod dto;
pub mod envelope;
pub mod ws;

pub use api::Api;
pub use envelope::{ApiResponse, ErrorBody};
pub use ws::WsRequest;
