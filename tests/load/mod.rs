mod burst_test;
