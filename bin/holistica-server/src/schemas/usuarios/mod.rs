pub mod auth;
pub mod mensagem;
pub mod notificacao;
pub mod paciente;
pub mod perfil;
pub mod relatorio;
pub mod sessao;
