mod test_destroy_room;
mod test_password_gate;
mod test_room_expiry;
