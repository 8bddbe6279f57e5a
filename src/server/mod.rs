pub mod web_server;
