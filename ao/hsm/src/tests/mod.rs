mod hsm_test;
