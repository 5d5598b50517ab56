
mod password_reset;
