mod session_key_tests;
