mod test_full_mesh;
