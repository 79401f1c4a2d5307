//! Servicio de visión para la cosecha de coco: detección de madurez con
//! sesiones de conteo exportables y clasificación de enfermedad, servido
//! por HTTP y WebSocket sobre una arquitectura hexagonal.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
